//! Error types for the admission gate.

use thiserror::Error;

/// Main error type for gate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Counter store errors (never produced by the in-memory limiter)
    #[error("Counter store error: {0}")]
    Store(String),

    /// Upstream forwarding errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GateError {
    fn from(err: config::ConfigError) -> Self {
        GateError::Config(err.to_string())
    }
}

/// Result type alias for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
