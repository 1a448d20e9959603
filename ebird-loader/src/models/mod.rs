//! Data models for the loaders

pub mod load_result;

pub use load_result::{IssueSeverity, LoadIssue, LoadSummary, RecordOutcome};
