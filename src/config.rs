// src/config.rs

//! Manages server configuration: loading, defaults and validation.

use crate::core::protocol::DEFAULT_MAX_BUFFER_SIZE;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// The validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// TCP keep-alive period for accepted connections. Absent or zero disables it.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub tcp_keepalive: Option<Duration>,
    /// Deadline applied to each pipeline iteration's reads and flush.
    /// Absent or zero disables it.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Reply buffer size; buffers above half of it are flushed eagerly.
    pub max_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            tcp_keepalive: None,
            timeout: None,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7878
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Creates a new `Config` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("'host' must not be empty"));
        }
        if self.max_buffer_size == 0 {
            return Err(anyhow!("'max_buffer_size' must be greater than zero"));
        }
        Ok(())
    }

    /// The keep-alive period, `None` when disabled.
    pub fn keepalive(&self) -> Option<Duration> {
        self.tcp_keepalive.filter(|d| !d.is_zero())
    }

    /// The per-command deadline, `None` when disabled.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|d| !d.is_zero())
    }

    /// Buffered reply bytes above which a flush happens before the next command.
    pub fn flush_threshold(&self) -> usize {
        self.max_buffer_size / 2
    }
}
