//! # rconctl
//!
//! A Minecraft RCON automation engine.
//!
//! rconctl drives one authenticated remote console session through scripted
//! or interactively assembled command groups, with explicit control over
//! timing and repetition. Every command's response is translated from `§`
//! formatting codes and rendered as a tree as the run progresses.
//!
//! ## Quick start
//!
//! ```no_run
//! use rconctl::rcon::RconConnector;
//! use rconctl::{Engine, EngineOptions, parse_str};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let script = parse_str(r#"
//! LOGIN 127.0.0.1:25565
//! RCONCFG[PORT=25575,PWD=secret]
//! LOOP main(freq=2) {
//!     EXEC greet { "say hi" }
//!     WAIT 1
//!     EXEC players { list }
//! }
//! "#)?;
//!
//!     let addr = format!("{}:{}", script.login.host, script.login.rcon_port).parse()?;
//!     let mut engine = Engine::new(EngineOptions::default());
//!     engine
//!         .connect(&RconConnector::default(), addr, &script.login.password)
//!         .await?;
//!     engine.run_script(&script).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Script syntax
//!
//! | Construct | Description |
//! |-----------|-------------|
//! | `LOGIN host:port` | Server host and game port |
//! | `RCONCFG[PORT=n,PWD=secret]` | RCON port and password |
//! | `LOOP name(freq=n) { ... }` | Run the enclosed modules `n` times |
//! | `EXEC name { ... }` | One command per line; quotes, blanks and `#` lines are dropped |
//! | `WAIT n` | Pause for `n` whole seconds |
//!
//! `LOGIN` and `RCONCFG` may appear anywhere; loops run in declaration order.
//!
//! ## Command groups
//!
//! [`interactive::run`] reads lines from a channel (stdin via
//! [`interactive::spawn_stdin_reader`], or any sender) and builds
//! [`group::CommandGroup`]s: plain lines are commands, `WAIT s` adds a delay,
//! `LOOP n` sets the repeat count, an empty line runs the group and `BREAK`
//! runs it and exits.
//!
//! ## Custom output handling
//!
//! [`Engine::new`] writes to stdout. [`Engine::with_handler`] sends all output
//! to any sink, which is how the tests capture the rendered tree.
//!
//! ## Custom transports
//!
//! The engine is generic over [`session::Session`]. Implement it, together
//! with [`session::Connector`], to run scripts over something other than
//! [`rcon::RconSession`].

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod interactive;
pub mod logging;
pub mod markup;
pub mod parser;
pub mod plan;
pub mod rcon;
pub(crate) mod render;
pub mod resolve;
pub mod script;
pub mod session;

pub use engine::{Engine, EngineOptions, EngineState, ExecutionReport, RunSummary};
pub use error::{ConnectError, InputError, ParseError, ResolveError, RunError, SessionError};
pub use parser::{parse_file, parse_str};
pub use script::{ExecModule, LoginConfig, LoopFunction, Module, ScriptDefinition, WaitModule};
