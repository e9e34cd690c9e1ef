// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// All errors that can end a connection attempt or session.
///
/// None of these are fatal to the connector: the supervisor logs them,
/// reports the connection as lost and retries while the door is opened.
#[derive(Debug, thiserror::Error)]
pub enum WiflyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid port: {value:?}")]
    InvalidPort { value: String },

    #[error("Cannot resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("Connect to {addr} failed: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out waiting for {pattern:?}")]
    ReadTimeout { pattern: String },

    #[error("Connection closed by device while waiting for {pattern:?}")]
    Eof { pattern: String },

    #[error("Invalid sensor value: {raw:?}")]
    InvalidSensorValue { raw: String },

    #[error("Configuration unavailable: {reason}")]
    Config { reason: String },

    #[error("Connection closed on request")]
    Closed,
}

impl WiflyError {
    /// Short failure category for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidPort { .. }
            | Self::Resolve { .. }
            | Self::Connect { .. }
            | Self::Config { .. } => "connect",
            Self::Io(_) | Self::ReadTimeout { .. } | Self::Eof { .. } => "protocol",
            Self::InvalidSensorValue { .. } => "parse",
            Self::Closed => "closed",
        }
    }
}

pub type Result<T> = std::result::Result<T, WiflyError>;
