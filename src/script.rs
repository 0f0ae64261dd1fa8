//! The structured script model produced by [`crate::parser`] and consumed by
//! [`crate::Engine`].
//!
//! `Display` on [`ScriptDefinition`] renders canonical script text that parses
//! back to an equal definition.

use std::fmt;
use std::time::Duration;

/// Server address and RCON credentials from the `LOGIN` and `RCONCFG` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginConfig {
    pub host: String,
    pub game_port: u16,
    pub rcon_port: u16,
    pub password: String,
}

/// A fully parsed script. Loops run in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDefinition {
    pub login: LoginConfig,
    pub loops: Vec<LoopFunction>,
}

impl ScriptDefinition {
    /// Total number of commands sent by one full run of the script.
    pub fn total_commands(&self) -> usize {
        self.loops
            .iter()
            .map(|l| l.commands_per_iteration() * l.repeat_count as usize)
            .sum()
    }
}

/// A named `LOOP` block repeated `repeat_count` times.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFunction {
    pub name: String,
    pub repeat_count: u32,
    pub modules: Vec<Module>,
}

impl LoopFunction {
    pub fn commands_per_iteration(&self) -> usize {
        self.modules
            .iter()
            .map(|m| match m {
                Module::Exec(exec) => exec.len(),
                Module::Wait(_) => 0,
            })
            .sum()
    }
}

/// One step of a loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Module {
    Exec(ExecModule),
    Wait(WaitModule),
}

impl Module {
    /// First command this module would send, if any.
    pub fn first_command(&self) -> Option<&str> {
        match self {
            Module::Exec(exec) => exec.commands.first().map(String::as_str),
            Module::Wait(_) => None,
        }
    }
}

/// A batch of commands sent one after another. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecModule {
    pub name: String,
    pub commands: Vec<String>,
}

impl ExecModule {
    pub fn new(name: impl Into<String>, commands: Vec<String>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A timed pause. `seconds` is always finite, positive and representable as a
/// [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitModule {
    pub seconds: f64,
}

impl WaitModule {
    /// Returns `None` unless `seconds` is greater than zero and fits in a
    /// [`Duration`].
    pub fn new(seconds: f64) -> Option<Self> {
        (seconds > 0.0 && Duration::try_from_secs_f64(seconds).is_ok()).then_some(Self { seconds })
    }

    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.seconds).unwrap_or(Duration::MAX)
    }
}

impl fmt::Display for ScriptDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let login = &self.login;
        writeln!(f, "LOGIN {}:{}", login.host, login.game_port)?;
        writeln!(
            f,
            "RCONCFG[PORT={},PWD={}]",
            login.rcon_port, login.password
        )?;
        for lp in &self.loops {
            writeln!(f)?;
            writeln!(f, "LOOP {}(freq={}) {{", lp.name, lp.repeat_count)?;
            for module in &lp.modules {
                match module {
                    Module::Exec(exec) => {
                        writeln!(f, "    EXEC {} {{", exec.name)?;
                        for cmd in &exec.commands {
                            writeln!(f, "        \"{cmd}\"")?;
                        }
                        writeln!(f, "    }}")?;
                    }
                    Module::Wait(wait) => writeln!(f, "    WAIT {}", wait.seconds)?,
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScriptDefinition {
        ScriptDefinition {
            login: LoginConfig {
                host: "mc.example.net".into(),
                game_port: 25565,
                rcon_port: 25575,
                password: "abc".into(),
            },
            loops: vec![LoopFunction {
                name: "main".into(),
                repeat_count: 2,
                modules: vec![
                    Module::Exec(ExecModule::new("a", vec!["say hi".into()])),
                    Module::Wait(WaitModule { seconds: 1.0 }),
                    Module::Exec(ExecModule::new("b", vec!["list".into(), "tps".into()])),
                ],
            }],
        }
    }

    #[test]
    fn test_total_commands() {
        assert_eq!(sample().total_commands(), 6);
    }

    #[test]
    fn test_wait_module_rejects_non_positive() {
        assert!(WaitModule::new(0.0).is_none());
        assert!(WaitModule::new(-5.0).is_none());
        assert!(WaitModule::new(f64::NAN).is_none());
        assert!(WaitModule::new(f64::INFINITY).is_none());
        assert_eq!(
            WaitModule::new(1.5).unwrap().duration(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_wait_module_rejects_overflowing_duration() {
        assert!(WaitModule::new(1e30).is_none());
        assert!(WaitModule::new(f64::MAX).is_none());
        let largest = WaitModule::new(u64::MAX as f64 / 2.0).unwrap();
        assert!(largest.duration() > Duration::from_secs(u64::MAX / 4));
    }

    #[test]
    fn test_display_renders_grammar() {
        let text = sample().to_string();
        assert!(text.starts_with("LOGIN mc.example.net:25565\nRCONCFG[PORT=25575,PWD=abc]\n"));
        assert!(text.contains("LOOP main(freq=2) {"));
        assert!(text.contains("    WAIT 1\n"));
        assert!(text.contains("        \"say hi\"\n"));
    }
}
