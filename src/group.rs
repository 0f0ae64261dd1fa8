//! The interactive command-group builder.
//!
//! [`GroupBuilder`] accumulates typed lines into a [`CommandGroup`] and
//! decides when that group should be flushed to the engine. It never talks
//! to a session itself; the driver in [`crate::interactive`] executes the
//! groups it hands out.

use crate::error::InputError;
use crate::script::{ExecModule, Module, WaitModule};

/// One buffered entry of a command group.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Command(String),
    Wait(f64),
}

/// A single-use batch of directives repeated `repeat_count` times.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandGroup {
    pub directives: Vec<Directive>,
    pub repeat_count: u32,
}

impl Default for CommandGroup {
    fn default() -> Self {
        Self {
            directives: Vec::new(),
            repeat_count: 1,
        }
    }
}

impl CommandGroup {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Empty the buffer and reset the repeat count to 1.
    pub fn clear(&mut self) {
        self.directives.clear();
        self.repeat_count = 1;
    }

    /// View the directives as a module list: one single-command exec module
    /// per command, one wait module per wait.
    pub fn to_modules(&self) -> Vec<Module> {
        self.directives
            .iter()
            .filter_map(|directive| match directive {
                Directive::Command(text) => Some(Module::Exec(ExecModule::new(
                    "command",
                    vec![text.clone()],
                ))),
                Directive::Wait(seconds) => WaitModule::new(*seconds).map(Module::Wait),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Accumulating,
    Terminated,
}

/// What the driver should do after one line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing changed.
    Idle,
    /// A directive was added to the buffer.
    Appended(Directive),
    /// The repeat count was set on an empty buffer.
    RepeatSet(u32),
    /// The line was rejected; the buffer is untouched.
    Rejected(InputError),
    /// Execute this group; the builder has already reset itself.
    Flush(CommandGroup),
    /// Execute the group if present, then end the session.
    Terminate(Option<CommandGroup>),
}

/// Line-driven state machine producing [`CommandGroup`]s.
///
/// ```
/// use rconctl::group::{GroupBuilder, Step};
///
/// let mut builder = GroupBuilder::new();
/// builder.feed("say hi");
/// match builder.feed("LOOP 3") {
///     Step::Flush(group) => assert_eq!(group.repeat_count, 3),
///     other => panic!("unexpected {other:?}"),
/// }
/// assert_eq!(builder.group().repeat_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct GroupBuilder {
    group: CommandGroup,
    terminated: bool,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BuilderState {
        if self.terminated {
            BuilderState::Terminated
        } else {
            BuilderState::Accumulating
        }
    }

    /// The group currently being accumulated.
    pub fn group(&self) -> &CommandGroup {
        &self.group
    }

    /// Take the buffered group, leaving an empty one with repeat count 1.
    /// Returns `None` when nothing is buffered.
    pub fn flush(&mut self) -> Option<CommandGroup> {
        if self.group.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.group))
    }

    /// Handle one line of input.
    pub fn feed(&mut self, line: &str) -> Step {
        if self.terminated {
            return Step::Idle;
        }
        let line = line.trim();
        if line.is_empty() {
            return self.flush().map_or(Step::Idle, Step::Flush);
        }

        let (keyword, arg) = match line.split_once(char::is_whitespace) {
            Some((keyword, arg)) => (keyword, Some(arg.trim())),
            None => (line, None),
        };

        if keyword.eq_ignore_ascii_case("BREAK") && arg.is_none() {
            return self.terminate();
        }
        if keyword.eq_ignore_ascii_case("WAIT") {
            return self.wait(arg);
        }
        if keyword.eq_ignore_ascii_case("LOOP") {
            return self.repeat(arg);
        }

        let directive = Directive::Command(line.to_string());
        self.group.directives.push(directive.clone());
        Step::Appended(directive)
    }

    /// Handle an external interrupt: flush what is buffered and terminate.
    pub fn interrupt(&mut self) -> Step {
        if self.terminated {
            return Step::Idle;
        }
        self.terminate()
    }

    fn terminate(&mut self) -> Step {
        self.terminated = true;
        Step::Terminate(self.flush())
    }

    fn wait(&mut self, arg: Option<&str>) -> Step {
        let arg = arg.unwrap_or_default();
        let Some(wait) = arg.parse::<f64>().ok().and_then(WaitModule::new) else {
            return Step::Rejected(InputError::InvalidWait(arg.to_string()));
        };
        let directive = Directive::Wait(wait.seconds);
        self.group.directives.push(directive.clone());
        Step::Appended(directive)
    }

    /// `LOOP n` on a non-empty buffer flushes with `n` and then drops back to
    /// a repeat count of 1 for the next buffer.
    fn repeat(&mut self, arg: Option<&str>) -> Step {
        let arg = arg.unwrap_or_default();
        let count = match arg.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => return Step::Rejected(InputError::InvalidRepeat(arg.to_string())),
        };
        self.group.repeat_count = count;
        self.flush().map_or(Step::RepeatSet(count), Step::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(group: &CommandGroup) -> Vec<&str> {
        group
            .directives
            .iter()
            .filter_map(|d| match d {
                Directive::Command(c) => Some(c.as_str()),
                Directive::Wait(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_commands_accumulate() {
        let mut b = GroupBuilder::new();
        assert_eq!(
            b.feed("say hi"),
            Step::Appended(Directive::Command("say hi".into()))
        );
        b.feed("list");
        assert_eq!(commands(b.group()), ["say hi", "list"]);
        assert_eq!(b.state(), BuilderState::Accumulating);
    }

    #[test]
    fn test_empty_line_flushes_non_empty_buffer() {
        let mut b = GroupBuilder::new();
        assert_eq!(b.feed(""), Step::Idle);
        b.feed("foo");
        let Step::Flush(group) = b.feed("   ") else {
            panic!("expected flush");
        };
        assert_eq!(commands(&group), ["foo"]);
        assert_eq!(group.repeat_count, 1);
        assert!(b.group().is_empty());
    }

    #[test]
    fn test_loop_flushes_with_new_count_then_resets() {
        let mut b = GroupBuilder::new();
        b.feed("foo");
        b.feed("bar");
        let Step::Flush(group) = b.feed("LOOP 3") else {
            panic!("expected flush");
        };
        assert_eq!(commands(&group), ["foo", "bar"]);
        assert_eq!(group.repeat_count, 3);
        assert!(b.group().is_empty());
        assert_eq!(b.group().repeat_count, 1);
    }

    #[test]
    fn test_loop_on_empty_buffer_applies_to_next_flush() {
        let mut b = GroupBuilder::new();
        assert_eq!(b.feed("loop 4"), Step::RepeatSet(4));
        b.feed("foo");
        let Step::Flush(group) = b.feed("") else {
            panic!("expected flush");
        };
        assert_eq!(group.repeat_count, 4);
        assert_eq!(b.group().repeat_count, 1);
    }

    #[test]
    fn test_bad_wait_rejected_without_state_change() {
        let mut b = GroupBuilder::new();
        b.feed("foo");
        b.feed("LOOP 2");
        b.feed("bar");
        let before = b.group().clone();
        for bad in [
            "WAIT -5", "WAIT 0", "WAIT soon", "WAIT", "WAIT NaN", "wait inf", "WAIT 1e30", "WAIT 1e300",
        ] {
            assert!(
                matches!(b.feed(bad), Step::Rejected(InputError::InvalidWait(_))),
                "{bad} should be rejected"
            );
            assert_eq!(b.group(), &before);
        }
        b.feed("baz");
        assert_eq!(commands(b.group()), ["bar", "baz"]);
    }

    #[test]
    fn test_bad_loop_rejected_without_state_change() {
        let mut b = GroupBuilder::new();
        b.feed("foo");
        for bad in ["LOOP 0", "LOOP -1", "LOOP x", "LOOP", "LOOP 1.5"] {
            assert!(matches!(
                b.feed(bad),
                Step::Rejected(InputError::InvalidRepeat(_))
            ));
        }
        assert_eq!(commands(b.group()), ["foo"]);
        assert_eq!(b.group().repeat_count, 1);
    }

    #[test]
    fn test_wait_appends_fractional_seconds() {
        let mut b = GroupBuilder::new();
        assert_eq!(b.feed("WAIT 1.5"), Step::Appended(Directive::Wait(1.5)));
    }

    #[test]
    fn test_break_on_empty_buffer_terminates_without_group() {
        let mut b = GroupBuilder::new();
        assert_eq!(b.feed("BREAK"), Step::Terminate(None));
        assert_eq!(b.state(), BuilderState::Terminated);
        assert_eq!(b.feed("say hi"), Step::Idle);
        assert_eq!(b.interrupt(), Step::Idle);
    }

    #[test]
    fn test_break_flushes_pending_group() {
        let mut b = GroupBuilder::new();
        b.feed("save-all");
        let Step::Terminate(Some(group)) = b.feed("break") else {
            panic!("expected terminate with group");
        };
        assert_eq!(commands(&group), ["save-all"]);
    }

    #[test]
    fn test_interrupt_flushes_and_terminates() {
        let mut b = GroupBuilder::new();
        b.feed("LOOP 2");
        b.feed("stop");
        let Step::Terminate(Some(group)) = b.interrupt() else {
            panic!("expected terminate with group");
        };
        assert_eq!(group.repeat_count, 2);
        assert_eq!(b.state(), BuilderState::Terminated);
    }

    #[test]
    fn test_break_with_argument_is_a_command() {
        let mut b = GroupBuilder::new();
        assert_eq!(
            b.feed("break now"),
            Step::Appended(Directive::Command("break now".into()))
        );
    }

    #[test]
    fn test_to_modules_preserves_order() {
        let group = CommandGroup {
            directives: vec![
                Directive::Command("a".into()),
                Directive::Wait(2.0),
                Directive::Command("b".into()),
            ],
            repeat_count: 1,
        };
        let modules = group.to_modules();
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[0].first_command(), Some("a"));
        assert_eq!(modules[1], Module::Wait(WaitModule { seconds: 2.0 }));
        assert_eq!(modules[2].first_command(), Some("b"));
    }
}
