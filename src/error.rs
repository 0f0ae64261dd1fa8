//! Error types for every stage of an RCON run.
//!
//! Parse, resolution and connection errors abort before any command is sent.
//! [`SessionError::Command`] is recovered locally by the engine, while
//! [`SessionError::Fatal`] aborts the remaining work.

use thiserror::Error;

/// A malformed script. Nothing is executed when parsing fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing LOGIN: expected `LOGIN <host>:<port>`")]
    MissingLogin,

    #[error("missing RCONCFG: expected `RCONCFG[PORT=<port>,PWD=<password>]`")]
    MissingRconConfig,

    #[error("invalid {field} port `{value}`: must be between 1 and 65535")]
    InvalidPort { field: &'static str, value: String },

    #[error("unterminated block `{name}` at offset {offset}")]
    UnterminatedBlock { name: String, offset: usize },

    #[error("loop `{name}` has invalid freq `{value}`: must be an integer >= 1")]
    InvalidFrequency { name: String, value: String },

    #[error("malformed {keyword} at offset {offset}")]
    Malformed { keyword: &'static str, offset: usize },

    #[error("invalid WAIT at offset {offset}: `{value}` is not a whole number of seconds > 0")]
    InvalidWait { value: String, offset: usize },
}

/// The target address could not be turned into a socket address.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid target `{0}`: expected host[:port]")]
    InvalidTarget(String),

    #[error("invalid port `{0}`: must be between 1 and 65535")]
    InvalidPort(String),

    #[error("failed to resolve host `{host}`: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("host `{0}` did not resolve to any address")]
    NoAddress(String),
}

/// Establishing or authenticating the session failed.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error(
        "connection to {addr} refused: check that enable-rcon=true in server.properties, \
         that port {port} is open and the server is online"
    )]
    Refused { addr: String, port: u16 },

    #[error(
        "connection to {addr} timed out after {secs:.1}s: check the network path, and if a \
         reverse proxy is in front of the server, forward the RCON port over TCP as well"
    )]
    Timeout { addr: String, secs: f64 },

    #[error("authentication rejected by {addr}: check the RCON password")]
    Authentication { addr: String },

    #[error("failed to connect to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A failure while sending a command over an established session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The command failed but the session is still usable.
    #[error("{0}")]
    Command(String),

    /// The session is gone; nothing further can be sent.
    #[error("session lost: {0}")]
    Fatal(String),
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// A rejected interactive control line. The builder state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid wait time `{0}`, use 'WAIT <seconds>' with seconds > 0")]
    InvalidWait(String),

    #[error("invalid repeat count `{0}`, use 'LOOP <count>' with count >= 1")]
    InvalidRepeat(String),
}

/// Why a script or command group stopped before completing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Fatal(#[from] SessionError),

    #[error("run cancelled")]
    Cancelled,

    #[error("engine is not running (state: {0})")]
    NotRunning(&'static str),
}
