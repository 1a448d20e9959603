//! # eBird Checklists Common Library
//!
//! Shared code for the checklist loader:
//! - Error type
//! - Configuration loading (TOML file, environment, defaults)
//! - Raw value coercion for source records
//! - Database schema creation and row models

pub mod config;
pub mod db;
pub mod error;
pub mod values;

pub use error::{Error, Result};
