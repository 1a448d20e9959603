//! External services

pub mod ebird_client;

pub use ebird_client::{ApiError, EbirdApi, EbirdClient, TaxonomyEntry, Visit};
