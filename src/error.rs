//! Error types for the request scorer
//!
//! Scoring itself never fails. These errors cover the fallible edges around it:
//! configuration loading, request record construction and CLI I/O.

use thiserror::Error;

/// Main error type for request scorer operations
#[derive(Error, Debug)]
pub enum ScorerError {
    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration was read but holds unusable values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request duration was negative or not a finite number
    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for request scorer operations
pub type Result<T> = std::result::Result<T, ScorerError>;

impl From<toml::de::Error> for ScorerError {
    fn from(err: toml::de::Error) -> Self {
        ScorerError::InvalidConfig(err.to_string())
    }
}
