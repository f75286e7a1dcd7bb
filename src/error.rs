//! # Error Types
//!
//! Custom error types for the GCS telemetry core using `thiserror`.

use thiserror::Error;

use crate::telemetry::codec::DecodeError;
use crate::telemetry::record::SourceId;

/// Main error type for the GCS telemetry core
#[derive(Debug, Error)]
pub enum GcsError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// A channel could not be connected
    #[error("[{channel}] connection failed: {reason}")]
    Connection { channel: SourceId, reason: String },

    /// The channel already has a live connection
    #[error("[{0}] already connected")]
    AlreadyConnected(SourceId),

    /// The channel has no live connection
    #[error("[{0}] not connected")]
    NotConnected(SourceId),

    /// A logging session could not be started
    #[error("logging not started: {0}")]
    LogStartRejected(String),

    /// Malformed operator or valve command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Telemetry line decode errors
    #[error("CSV parsing failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Result type alias for the GCS telemetry core
pub type Result<T> = std::result::Result<T, GcsError>;
