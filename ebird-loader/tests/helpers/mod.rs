//! Test Helper Utilities
//!
//! Shared utilities for the loader integration tests

#![allow(dead_code, unused_imports)]

pub mod mock_api;
pub mod sources;

// Re-export commonly used items
pub use mock_api::{checklist_json, location_json, MockApi};
pub use sources::{at, personal_row, seed_species, write_csv, write_tsv, BulkRow, CsvRow};
