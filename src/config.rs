// MIT License - Copyright (c) 2026 Peter Wright
// Connection settings and their sources

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{POLL_INTERVAL, PRESS_PULSE, READ_TIMEOUT, RETRY_DELAY};
use crate::error::{Result, WiflyError};

/// Settings needed to reach and unlock the WiFly module.
///
/// The port is kept as text, the way the settings store hands it over. It is
/// only parsed when a connection is attempted, so a bad value fails that
/// attempt instead of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Module host name or IP address
    pub host: String,
    /// Module TCP port (default: 2000)
    pub port: String,
    /// Module remote access password
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.1".to_string(),
            port: default_port(),
            password: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Parse the port, rejecting anything that is not a valid TCP port.
    pub fn port_number(&self) -> Result<u16> {
        self.port
            .trim()
            .parse()
            .map_err(|_| WiflyError::InvalidPort {
                value: self.port.clone(),
            })
    }
}

/// Builder for ConnectionConfig.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: impl ToString) -> Self {
        self.config.port = port.to_string();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

/// Where the connector gets its settings from.
///
/// Queried once per connection attempt, so a source may change between
/// attempts and the next reconnect picks the new values up.
pub trait ConfigSource: Send + Sync {
    fn connection_config(&self) -> Result<ConnectionConfig>;
}

impl ConfigSource for ConnectionConfig {
    fn connection_config(&self) -> Result<ConnectionConfig> {
        Ok(self.clone())
    }
}

/// Settings that another part of the application may edit at runtime.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<ConnectionConfig>>,
}

impl SharedConfig {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the settings used by the next connection attempt.
    pub fn update(&self, config: ConnectionConfig) {
        match self.inner.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }
}

impl ConfigSource for SharedConfig {
    fn connection_config(&self) -> Result<ConnectionConfig> {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| WiflyError::Config {
                reason: "settings lock poisoned".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// TOML file
// ---------------------------------------------------------------------------

/// On-disk configuration file.
///
/// ```toml
/// [device]
/// host = "10.0.0.1"
/// port = 2000
/// password = "secret"
/// ```
#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub device: DeviceToml,
}

#[derive(Debug, Deserialize)]
pub struct DeviceToml {
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: String,
    pub password: String,
}

fn default_port() -> String {
    "2000".to_string()
}

/// Accept the port either as a TOML integer or as a string.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(i64),
        Text(String),
    }

    Ok(match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => n.to_string(),
        PortValue::Text(s) => s,
    })
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| WiflyError::Config {
            reason: e.to_string(),
        })
    }
}

impl From<DeviceToml> for ConnectionConfig {
    fn from(device: DeviceToml) -> Self {
        Self {
            host: device.host,
            port: device.port,
            password: device.password,
        }
    }
}

/// A TOML file that is read again on every connection attempt.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ConfigSource for ConfigFile {
    fn connection_config(&self) -> Result<ConnectionConfig> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| WiflyError::Config {
            reason: format!("{}: {e}", self.path.display()),
        })?;
        Ok(FileConfig::parse(&text)?.device.into())
    }
}

// ---------------------------------------------------------------------------
// Timings
// ---------------------------------------------------------------------------

/// Timing of the connection and polling loop.
///
/// The defaults are what the module is known to work with; shorter values
/// are only meant for tests against a simulated module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Upper bound on a single blocking read
    pub read_timeout: Duration,
    /// Delay before reconnecting after a lost connection
    pub retry_delay: Duration,
    /// Maximum wait between two sensor polls
    pub poll_interval: Duration,
    /// How long the relay is held for a button press
    pub press_pulse: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            read_timeout: READ_TIMEOUT,
            retry_delay: RETRY_DELAY,
            poll_interval: POLL_INTERVAL,
            press_pulse: PRESS_PULSE,
        }
    }
}
