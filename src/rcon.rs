//! Source RCON over TCP.
//!
//! Every packet is `i32 length, i32 id, i32 type, body, 0x00 0x00`, all
//! little-endian, where `length` counts everything after itself.

use crate::error::{ConnectError, SessionError};
use crate::session::{Connector, Session};
use async_trait::async_trait;
use rand::Rng;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Longest command body the server accepts.
pub const MAX_COMMAND_LEN: usize = 1446;

const MIN_PACKET_LEN: i32 = 10;
const MAX_PACKET_LEN: i32 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let length = (body.len() + 10) as i32;
        let mut buf = Vec::with_capacity(body.len() + 14);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    /// Read one packet. Invalid UTF-8 in the body is replaced, not rejected.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Self> {
        let length = reader.read_i32_le().await?;
        if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&length) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid packet length {length}"),
            ));
        }
        let id = reader.read_i32_le().await?;
        let kind = reader.read_i32_le().await?;
        let mut payload = vec![0u8; (length - 8) as usize];
        reader.read_exact(&mut payload).await?;

        let end = payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(payload.len());
        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(&payload[..end]).into_owned(),
        })
    }
}

async fn open(addr: SocketAddr, limit: Duration) -> Result<TcpStream, ConnectError> {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(err)) if err.kind() == io::ErrorKind::ConnectionRefused => {
            Err(ConnectError::Refused {
                addr: addr.to_string(),
                port: addr.port(),
            })
        }
        Ok(Err(source)) => Err(ConnectError::Io {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(ConnectError::Timeout {
            addr: addr.to_string(),
            secs: limit.as_secs_f64(),
        }),
    }
}

/// Check that something accepts TCP connections on the game port.
pub async fn probe(addr: SocketAddr, limit: Duration) -> Result<(), ConnectError> {
    let mut stream = open(addr, limit).await?;
    let _ = stream.shutdown().await;
    debug!(%addr, "game port reachable");
    Ok(())
}

/// Opens [`RconSession`]s.
#[derive(Debug, Clone)]
pub struct RconConnector {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for RconConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            command_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait(?Send)]
impl Connector for RconConnector {
    type Session = RconSession;

    async fn connect(&self, addr: SocketAddr, password: &str) -> Result<RconSession, ConnectError> {
        let stream = open(addr, self.connect_timeout).await?;
        let mut session = RconSession {
            stream,
            next_id: rand::thread_rng().gen_range(1..i32::MAX / 2),
            command_timeout: self.command_timeout,
        };
        let authenticated = timeout(self.connect_timeout, session.authenticate(password)).await;
        match authenticated {
            Ok(Ok(true)) => Ok(session),
            Ok(Ok(false)) => Err(ConnectError::Authentication {
                addr: addr.to_string(),
            }),
            Ok(Err(source)) => Err(ConnectError::Io {
                addr: addr.to_string(),
                source,
            }),
            Err(_) => Err(ConnectError::Timeout {
                addr: addr.to_string(),
                secs: self.connect_timeout.as_secs_f64(),
            }),
        }
    }
}

/// An authenticated RCON connection.
#[derive(Debug)]
pub struct RconSession {
    stream: TcpStream,
    next_id: i32,
    command_timeout: Duration,
}

impl RconSession {
    fn request_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn write(&mut self, packet: &Packet) -> io::Result<()> {
        self.stream.write_all(&packet.encode()).await?;
        self.stream.flush().await
    }

    /// Servers may send an empty response value before the auth response.
    async fn authenticate(&mut self, password: &str) -> io::Result<bool> {
        let id = self.request_id();
        self.write(&Packet::new(id, SERVERDATA_AUTH, password)).await?;
        loop {
            let packet = Packet::read_from(&mut self.stream).await?;
            if packet.kind != SERVERDATA_AUTH_RESPONSE {
                continue;
            }
            return Ok(packet.id == id);
        }
    }

    async fn exchange(&mut self, command: &str) -> io::Result<String> {
        let id = self.request_id();
        self.write(&Packet::new(id, SERVERDATA_EXECCOMMAND, command))
            .await?;
        loop {
            let packet = Packet::read_from(&mut self.stream).await?;
            if packet.id == id && packet.kind == SERVERDATA_RESPONSE_VALUE {
                return Ok(packet.body);
            }
            warn!(
                expected = id,
                got = packet.id,
                kind = packet.kind,
                "discarding unexpected RCON packet"
            );
        }
    }
}

#[async_trait(?Send)]
impl Session for RconSession {
    async fn send(&mut self, command: &str) -> Result<String, SessionError> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(SessionError::Command(format!(
                "command is {} bytes long, the limit is {MAX_COMMAND_LEN}",
                command.len()
            )));
        }
        debug!(command, "sending");
        let limit = self.command_timeout;
        let result = timeout(limit, self.exchange(command)).await;
        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(SessionError::Fatal(err.to_string())),
            Err(_) => Err(SessionError::Fatal(format!(
                "no response within {:.1}s",
                limit.as_secs_f64()
            ))),
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
