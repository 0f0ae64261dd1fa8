//! The [`Session`] and [`Connector`] traits the engine drives.
//!
//! [`crate::rcon`] provides the TCP implementation. Tests substitute
//! in-memory sessions.

use crate::error::{ConnectError, SessionError};
use async_trait::async_trait;
use std::net::SocketAddr;

/// An authenticated remote console connection. One command is in flight at
/// a time.
#[async_trait(?Send)]
pub trait Session: 'static {
    /// Send one command and return the raw response text.
    ///
    /// [`SessionError::Command`] means the command failed but the session is
    /// still usable; [`SessionError::Fatal`] means it is not.
    async fn send(&mut self, command: &str) -> Result<String, SessionError>;

    /// Release the connection. Called once at the end of a run.
    async fn close(&mut self);
}

/// Opens and authenticates a [`Session`].
#[async_trait(?Send)]
pub trait Connector {
    type Session: Session;

    async fn connect(&self, addr: SocketAddr, password: &str)
    -> Result<Self::Session, ConnectError>;
}
