//! Line-by-line command-group mode.
//!
//! Reads lines from a channel, feeds them to a [`GroupBuilder`] and hands
//! flushed groups to the engine. Ctrl-C while waiting for input and end of
//! input both act like `BREAK`. Stdin is read on its own thread (see
//! [`spawn_stdin_reader`]) so a blocked read never holds up shutdown.

use crate::cancel::CancelToken;
use crate::engine::Engine;
use crate::error::RunError;
use crate::group::{BuilderState, CommandGroup, Directive, GroupBuilder, Step};
use crate::markup::ansi;
use crate::session::Session;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

pub const PROMPT: &str = "-> ";

const USAGE: [(&str, &str); 5] = [
    ("<command>", "add a command to the current group"),
    ("WAIT <seconds>", "add a delay"),
    ("LOOP <count>", "repeat the current group <count> times and run it"),
    ("BREAK", "run the current group and exit"),
    ("<empty line>", "run the current group"),
];

struct Printer {
    color: bool,
}

impl Printer {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{}", ansi::RESET)
        } else {
            text.to_string()
        }
    }

    fn usage(&self) -> String {
        let mut out = String::from("command group mode:\n");
        for (input, meaning) in USAGE {
            out.push_str(&format!("  {} {meaning}\n", self.paint(ansi::YELLOW, &format!("{input:<15}"))));
        }
        out
    }

    fn prompt(&self) -> String {
        self.paint(ansi::CYAN, PROMPT.trim_end()) + " "
    }

    fn tagged(&self, code: &str, tag: &str, message: &str) -> String {
        format!("{} {message}\n", self.paint(code, tag))
    }

    fn acknowledge(&self, step: &Step) -> Option<String> {
        let line = match step {
            Step::Appended(Directive::Command(command)) => {
                self.tagged(ansi::PURPLE, "[JOIN]", &format!("added command: {command}"))
            }
            Step::Appended(Directive::Wait(seconds)) => {
                self.tagged(ansi::YELLOW, "[WAIT]", &format!("added delay: {seconds}s"))
            }
            Step::RepeatSet(count) => self.tagged(
                ansi::CYAN,
                "[LOOP]",
                &format!("next group repeats {count} time(s)"),
            ),
            Step::Rejected(err) => self.tagged(ansi::RED, "[ERROR]", &err.to_string()),
            Step::Flush(group) if group.repeat_count > 1 => self.tagged(
                ansi::CYAN,
                "[LOOP]",
                &format!("running group {} time(s)", group.repeat_count),
            ),
            Step::Idle | Step::Flush(_) | Step::Terminate(_) => return None,
        };
        Some(line)
    }
}

/// Spawn a background thread that reads stdin line by line.
///
/// The channel closes at end of input or on a read error. The thread exits
/// once the receiver is dropped and the next line arrives; a read that never
/// returns does not keep the runtime alive.
pub fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("failed to read input: {err}");
                    break;
                }
            }
        }
    });
    rx
}

/// Drive `engine` from `input` until `BREAK`, end of input or an interrupt.
/// The session is closed on return.
///
/// Interrupting a running group abandons it and leaves the mode normally.
/// Only a fatal session error ends the mode with an error.
pub async fn run<S: Session>(
    engine: &mut Engine<S>,
    mut input: UnboundedReceiver<String>,
    mut cancel: CancelToken,
) -> Result<(), RunError> {
    let printer = Printer {
        color: engine.options().color,
    };
    let mut builder = GroupBuilder::new();
    engine.emit(printer.usage().as_bytes());
    cancel.reset();

    while builder.state() == BuilderState::Accumulating {
        engine.emit(printer.prompt().as_bytes());
        let step = tokio::select! {
            line = input.recv() => match line {
                Some(line) => builder.feed(&line),
                None => {
                    debug!("end of input");
                    engine.emit(b"\n");
                    builder.interrupt()
                }
            },
            _ = cancel.cancelled() => {
                debug!("interrupted while reading input");
                engine.emit(b"\n");
                builder.interrupt()
            }
        };

        if let Some(ack) = printer.acknowledge(&step) {
            engine.emit(ack.as_bytes());
        }
        let group = match step {
            Step::Flush(group) | Step::Terminate(Some(group)) => group,
            _ => continue,
        };
        match execute(engine, group).await {
            Ok(()) => {}
            Err(RunError::Cancelled) => {
                info!("command group interrupted");
                engine.emit(printer.tagged(ansi::RED, "[STOP]", "group interrupted").as_bytes());
                break;
            }
            Err(err) => return Err(err),
        }
    }

    engine.finish().await;
    engine.emit(b"left command group mode\n");
    Ok(())
}

async fn execute<S: Session>(engine: &mut Engine<S>, mut group: CommandGroup) -> Result<(), RunError> {
    let summary = engine.run_group(&mut group).await?;
    debug!(
        sent = summary.commands_sent,
        failed = summary.commands_failed,
        "group finished"
    );
    Ok(())
}
