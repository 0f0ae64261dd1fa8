//! Tree-shaped progress output for script and group runs.
//!
//! Line prefixes depend only on a [`TreePosition`], so the exact shape of a
//! run's output is a pure function of where each command sits in its module,
//! loop iteration and loop.

use crate::markup::{self, ansi};
use std::time::Duration;

const PROGRESS_WIDTH: usize = 20;

/// Where a command or wait sits in the run. All indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePosition {
    pub last_command: bool,
    pub last_module: bool,
    pub last_iteration: bool,
}

impl TreePosition {
    pub fn new(
        module_index: usize,
        total_modules: usize,
        command_index: usize,
        total_commands: usize,
        iteration_index: usize,
        total_iterations: usize,
    ) -> Self {
        Self {
            last_command: command_index + 1 == total_commands,
            last_module: module_index + 1 == total_modules,
            last_iteration: iteration_index + 1 == total_iterations,
        }
    }

    /// The final module of the final iteration closes the tree with `└─`.
    pub fn closes_tree(self) -> bool {
        self.last_module && self.last_iteration
    }
}

/// Prefixes for one command line and its result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandGlyphs {
    /// Column carrying the loop's vertical rule.
    pub gutter: &'static str,
    /// Connector in front of the command itself.
    pub branch: &'static str,
    /// Connector in front of the result line.
    pub result: &'static str,
}

pub fn command_glyphs(position: TreePosition, total_commands: usize) -> CommandGlyphs {
    let closes = position.closes_tree();
    if total_commands > 1 {
        CommandGlyphs {
            gutter: if closes { "  " } else { "│" },
            branch: if position.last_command { "└─" } else { "├─" },
            result: if position.last_command { "  " } else { "│ " },
        }
    } else {
        CommandGlyphs {
            gutter: if closes { "  " } else { "│" },
            branch: if closes { "└─" } else { "├─" },
            result: "",
        }
    }
}

/// Formats run output, optionally with ANSI colors.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{}", ansi::RESET)
        } else {
            text.to_string()
        }
    }

    /// Translate `§` codes when coloring, strip them otherwise.
    pub fn response(&self, raw: &str) -> String {
        if self.color {
            markup::translate(raw)
        } else {
            markup::strip(raw)
        }
    }

    pub fn script_header(&self, loops: usize, commands: usize) -> String {
        self.paint(
            ansi::CYAN,
            &format!(">> script: {loops} loop(s), {commands} command(s)"),
        )
    }

    pub fn script_complete(&self) -> String {
        self.paint(ansi::GREEN, ">> script complete")
    }

    pub fn loop_header(&self, name: &str, repeat_count: u32) -> String {
        self.paint(ansi::CYAN, &format!("┌── loop: {name} ({repeat_count}x)"))
    }

    pub fn iteration_header(&self, iteration: usize, total: usize) -> String {
        format!(
            "{}\n{}",
            self.paint(ansi::CYAN, "│"),
            self.paint(ansi::CYAN, &format!("├─ iteration {iteration}/{total}"))
        )
    }

    pub fn module_header(&self, name: &str, position: TreePosition) -> String {
        let branch = if position.closes_tree() { "└─" } else { "├─" };
        format!(
            "{} {}",
            self.paint(ansi::CYAN, branch),
            self.paint(ansi::PURPLE, &format!("module: {name}"))
        )
    }

    pub fn command(
        &self,
        command: &str,
        position: TreePosition,
        total_commands: usize,
        failed: bool,
    ) -> String {
        let glyphs = command_glyphs(position, total_commands);
        let text = self.paint(if failed { ansi::RED } else { ansi::YELLOW }, command);
        if total_commands > 1 {
            format!(
                "{}   {} {text}",
                self.paint(ansi::CYAN, glyphs.gutter),
                self.paint(ansi::PURPLE, glyphs.branch)
            )
        } else {
            format!("{} {text}", self.paint(ansi::CYAN, glyphs.branch))
        }
    }

    /// A labelled result under a command. Multi-line text keeps the prefix on
    /// every line.
    pub fn result(
        &self,
        label: &str,
        text: &str,
        position: TreePosition,
        total_commands: usize,
        failed: bool,
    ) -> String {
        let glyphs = command_glyphs(position, total_commands);
        let prefix = if total_commands > 1 {
            format!(
                "{}   {}   ",
                self.paint(ansi::CYAN, glyphs.gutter),
                self.paint(ansi::PURPLE, glyphs.result)
            )
        } else {
            format!("{}   ", self.paint(ansi::CYAN, glyphs.gutter))
        };
        let code = if failed { ansi::RED } else { ansi::GREEN };
        let indent = " ".repeat(label.chars().count() + 2);

        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        let mut out = format!("{prefix}{}", self.paint(code, &format!("{label}: {first}")));
        for line in lines {
            out.push('\n');
            out.push_str(&format!("{prefix}{indent}{line}"));
        }
        out
    }

    pub fn wait_start(&self, seconds: f64, position: TreePosition) -> String {
        let branch = if position.closes_tree() { "└─" } else { "├─" };
        format!(
            "{} {}",
            self.paint(ansi::CYAN, branch),
            self.paint(ansi::BLUE, &format!("wait {seconds}s"))
        )
    }

    fn wait_gutter(&self, position: TreePosition) -> String {
        self.paint(
            ansi::CYAN,
            if position.closes_tree() { "  " } else { "│" },
        )
    }

    /// An in-place progress frame, starting with `\r` and without a newline.
    pub fn wait_progress(
        &self,
        total: Duration,
        remaining: Duration,
        position: TreePosition,
        next: Option<&str>,
    ) -> String {
        let fraction = if total.is_zero() {
            1.0
        } else {
            (1.0 - remaining.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        };
        let filled = (fraction * PROGRESS_WIDTH as f64) as usize;
        let bar = format!(
            "[{}{}] {}% ({:.1}s)",
            "█".repeat(filled),
            "░".repeat(PROGRESS_WIDTH - filled),
            (fraction * 100.0) as u32,
            remaining.as_secs_f64()
        );
        let next = next
            .map(|cmd| format!(" next: {}", self.paint(ansi::YELLOW, cmd)))
            .unwrap_or_default();
        format!(
            "\r{}   {}{next}",
            self.wait_gutter(position),
            self.paint(ansi::BLUE, &bar)
        )
    }

    /// Overwrites the progress frame; padded to clear any leftover text.
    pub fn wait_done(&self, position: TreePosition) -> String {
        format!(
            "\r{}   {} {}{}",
            self.wait_gutter(position),
            self.paint(ansi::BLUE, "└─"),
            self.paint(ansi::YELLOW, "wait complete"),
            " ".repeat(40)
        )
    }

    pub fn warning(&self, message: &str) -> String {
        self.paint(ansi::YELLOW, &format!("!! {message}"))
    }

    pub fn fatal(&self, message: &str) -> String {
        self.paint(ansi::RED, &format!("!! {message}"))
    }
}
