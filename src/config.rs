//! Settings file (`config.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

fn default_rcon_port() -> u16 {
    25575
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// RCON port used when none is given on the command line.
    #[serde(default = "default_rcon_port")]
    pub rcon_port: u16,

    /// RCON password used when neither `--password` nor `RCON_PASSWORD` is set.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rcon_port: default_rcon_port(),
            password: None,
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            color: true,
        }
    }
}

impl Settings {
    /// `<config dir>/rconctl/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rconctl")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }
}
