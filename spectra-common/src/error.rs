//! Common error types for the spectra analyzer client

use thiserror::Error;

/// Common result type for spectra analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the spectra analyzer crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed Engine.IO / Socket.IO frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// WebSocket transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server closed the channel
    #[error("Disconnected from {0}")]
    Disconnected(String),

    /// Inbound event with no registered handler
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Invalid user input or command argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
