//! Turning `host[:port]` into a socket address.

use crate::error::ResolveError;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::lookup_host;
use tracing::debug;

/// Which edition of the game a target runs. Only the default port differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    Java,
    Bedrock,
}

impl Flavor {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Java => 25565,
            Self::Bedrock => 19132,
        }
    }
}

/// A user-supplied `host[:port]`. IPv6 literals with a port use brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
}

impl FromStr for Target {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ResolveError::InvalidTarget(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            host.parse::<Ipv6Addr>().map_err(|_| invalid())?;
            let port = match tail {
                "" => None,
                _ => Some(parse_port(tail.strip_prefix(':').ok_or_else(invalid)?)?),
            };
            return Ok(Self {
                host: host.to_string(),
                port,
            });
        }

        if s.parse::<Ipv6Addr>().is_ok() {
            return Ok(Self {
                host: s.to_string(),
                port: None,
            });
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && !host.contains(':') => Ok(Self {
                host: host.to_string(),
                port: Some(parse_port(port)?),
            }),
            Some(_) => Err(invalid()),
            None if s.chars().any(char::is_whitespace) => Err(invalid()),
            None => Ok(Self {
                host: s.to_string(),
                port: None,
            }),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(port) => write!(f, "{host}:{port}"),
            None => f.write_str(&host),
        }
    }
}

pub fn parse_port(value: &str) -> Result<u16, ResolveError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ResolveError::InvalidPort(value.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub ip: IpAddr,
    pub port: u16,
    /// Always `false`: lookups go through the system resolver only.
    pub used_service_record: bool,
}

impl Resolved {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// The same host on another port, e.g. the RCON port.
    pub fn with_port(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.ip, port)
    }
}

/// Resolve `target`, filling in the flavor's default port. IP literals skip
/// the lookup; hostnames prefer an IPv4 answer.
pub async fn resolve(target: &Target, flavor: Flavor) -> Result<Resolved, ResolveError> {
    let port = target.port.unwrap_or_else(|| flavor.default_port());
    if let Ok(ip) = target.host.parse::<IpAddr>() {
        return Ok(Resolved {
            ip,
            port,
            used_service_record: false,
        });
    }

    let addrs: Vec<SocketAddr> = lookup_host((target.host.as_str(), port))
        .await
        .map_err(|source| ResolveError::Lookup {
            host: target.host.clone(),
            source,
        })?
        .collect();
    let addr = addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .ok_or_else(|| ResolveError::NoAddress(target.host.clone()))?;
    debug!(host = %target.host, ip = %addr.ip(), "resolved");
    Ok(Resolved {
        ip: addr.ip(),
        port,
        used_service_record: false,
    })
}
