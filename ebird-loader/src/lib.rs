//! ebird-loader library
//!
//! Reconciles eBird checklists from three sources (Basic Dataset extracts,
//! the eBird API and personal exports) into one SQLite store. The binary in
//! `main.rs` is a thin CLI over [`loaders`]; integration tests drive the
//! loaders directly.

pub mod config;
pub mod error;
pub mod extractors;
pub mod loaders;
pub mod models;
pub mod reconcile;
pub mod services;

pub use crate::error::{LoaderError, LoaderResult};
