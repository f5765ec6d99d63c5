//! Error types for card sessions.

use thiserror::Error;

/// Failures reported by a transport adapter.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to establish PC/SC context: {0}")]
    Context(String),

    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    #[error("Failed to connect to card: {0}")]
    Connect(String),

    #[error("Failed to transmit APDU: {0}")]
    Transmit(String),

    #[error("Failed to disconnect card: {0}")]
    Disconnect(String),

    #[error("Card already released")]
    Released,

    /// A scripted transport ran out of responses.
    #[error("No response available for APDU {apdu}")]
    NoResponse { apdu: String },

    #[cfg(feature = "pcsc")]
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
}

/// Failures turning raw card payloads into record fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{field}: expected at least {needed} characters, got {actual}")]
    TooShort {
        field: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("{field}: invalid date {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

/// Error that terminates a read session.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A catalog entry has no APDUs to transmit.
    #[error("Command {name} has no APDUs")]
    EmptyCommand { name: &'static str },
}

/// Errors loading a reader configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, ReadError>;
