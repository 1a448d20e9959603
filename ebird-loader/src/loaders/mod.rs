//! Source loaders
//!
//! Each loader iterates one source, reconciles the entities of every record
//! and owns the transaction boundary:
//! - **BasicDatasetLoader** - one transaction per row
//! - **ApiLoader** - one transaction per region and date, a savepoint per
//!   checklist and per observation
//! - **SpeciesTaxonomyLoader** - one transaction for the whole taxonomy
//! - **PersonalDataLoader** - one transaction per row

pub mod api;
pub mod basic_dataset;
pub mod personal;
pub mod taxonomy;

pub use api::ApiLoader;
pub use basic_dataset::BasicDatasetLoader;
pub use personal::PersonalDataLoader;
pub use taxonomy::SpeciesTaxonomyLoader;

use chrono::NaiveDateTime;
use ebird_common::db::Table;
use sqlx::SqliteConnection;

use crate::error::{LoaderError, LoaderResult};
use crate::models::RecordOutcome;
use crate::reconcile::{find_by_key, NaturalKey, Revision};

/// Where an incoming checklist stands against the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// No checklist with this identifier is stored
    New,
    /// Stored checklist has an older (or no) revision
    Modified,
    /// Stored checklist is as new as the incoming one
    Unchanged,
}

impl RecordStatus {
    pub fn outcome(self) -> RecordOutcome {
        match self {
            RecordStatus::New => RecordOutcome::Added,
            RecordStatus::Modified => RecordOutcome::Updated,
            RecordStatus::Unchanged => RecordOutcome::Unchanged,
        }
    }
}

/// Compare an incoming checklist revision with the stored checklist's `edited`
pub async fn checklist_status(
    conn: &mut SqliteConnection,
    identifier: &str,
    edited: NaiveDateTime,
) -> LoaderResult<RecordStatus> {
    let key = NaturalKey::Identifier(identifier.to_string());

    let status = match find_by_key(conn, Table::Checklist, &key).await? {
        None => RecordStatus::New,
        Some(existing) if Revision::Tracked(edited).supersedes(existing.edited) => {
            RecordStatus::Modified
        }
        Some(_) => RecordStatus::Unchanged,
    };

    Ok(status)
}

/// Fail with `NotFound` before reading anything when the input is missing
fn require_file(path: &std::path::Path) -> LoaderResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LoaderError::NotFound(path.to_path_buf()))
    }
}

fn failed(error: &LoaderError) -> RecordOutcome {
    RecordOutcome::Failed {
        reason: error.to_string(),
    }
}
