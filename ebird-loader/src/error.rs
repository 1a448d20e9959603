//! Error types for the loaders
//!
//! A [`LoaderError`] returned for a single record is caught by the loader's
//! driving loop and turned into a failed record outcome. Only errors raised
//! before the first record (missing input, unreadable header) end a run.

use std::path::PathBuf;
use thiserror::Error;

use crate::services::ebird_client::ApiError;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// ebird-common error (value coercion, configuration, schema)
    #[error(transparent)]
    Common(#[from] ebird_common::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("eBird API error: {0}")]
    Api(#[from] ApiError),

    /// Input file does not exist
    #[error("File \"{}\" does not exist", .0.display())]
    NotFound(PathBuf),

    /// Empty natural key rejected under the strict key policy
    #[error("Empty natural key for {kind}")]
    EmptyNaturalKey { kind: &'static str },

    /// Observation refers to a species code that has not been loaded
    #[error("Unknown species code: {0}")]
    UnknownSpecies(String),

    /// Required field missing from a source record
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;
