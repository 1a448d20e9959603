//! Common error types for the eBird checklist loader

use thiserror::Error;

/// Common result type for checklist database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the workspace crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A source value could not be cast to its column type
    #[error("Invalid {expected} value {value:?}: {reason}")]
    InvalidValue {
        expected: &'static str,
        value: String,
        reason: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_value(expected: &'static str, value: &str, reason: impl ToString) -> Self {
        Error::InvalidValue {
            expected,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
