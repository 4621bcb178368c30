//! Historian Error Types

use thiserror::Error;

/// Errors raised by the historian store
#[derive(Debug, Error)]
pub enum HistorianError {
    /// Invalid connection parameters or failed construction round-trip
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any error reported by the database driver
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Value could not be encoded to or decoded from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored timestamp text could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Unrecognized query order name
    #[error("Invalid query order: {0} (expected FIRST_TO_LAST or LAST_TO_FIRST)")]
    InvalidOrder(String),
}

impl From<config::ConfigError> for HistorianError {
    fn from(err: config::ConfigError) -> Self {
        HistorianError::Config(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HistorianError>;
