//! Load results
//!
//! Every unit a loader processes (bulk row, API checklist, personal export
//! row) ends in exactly one [`RecordOutcome`]. The driving loop feeds each
//! outcome into a [`LoadSummary`], which keeps the counters reported at the
//! end of the run and the issues that explain skipped or failed units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    /// Part of a unit was dropped (one observation of a checklist), the unit loaded
    Warning,
    /// Unit could not be fetched, nothing written for it
    Skip,
    /// Unit was fetched or read but could not be stored
    Failed,
}

/// Details of a skipped or failed unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadIssue {
    /// Row number, checklist identifier or region/date the issue belongs to
    pub unit: String,

    pub message: String,

    pub severity: IssueSeverity,

    pub occurred_at: DateTime<Utc>,
}

impl LoadIssue {
    pub fn new(unit: impl Into<String>, message: impl Into<String>, severity: IssueSeverity) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
            severity,
            occurred_at: Utc::now(),
        }
    }
}

/// Result of processing one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecordOutcome {
    Added,
    Updated,
    Unchanged,
    Skipped { reason: String },
    Failed { reason: String },
}

/// Counters for one load run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Units processed, whatever their outcome
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Observations removed by the orphan sweep
    pub deleted: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one unit's outcome
    pub fn record(&mut self, unit: &str, outcome: RecordOutcome) {
        self.total += 1;

        match outcome {
            RecordOutcome::Added => self.added += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Skipped { reason } => {
                self.skipped += 1;
                self.issues.push(LoadIssue::new(unit, reason, IssueSeverity::Skip));
            }
            RecordOutcome::Failed { reason } => {
                self.failed += 1;
                self.issues.push(LoadIssue::new(unit, reason, IssueSeverity::Failed));
            }
        }
    }

    /// Note a problem that did not change the unit's outcome
    pub fn warn(&mut self, unit: &str, message: impl Into<String>) {
        self.issues.push(LoadIssue::new(unit, message, IssueSeverity::Warning));
    }

    /// Note a whole unit that never produced records (e.g. a visit list that
    /// could not be fetched). Does not count towards `total`.
    pub fn skip_unit(&mut self, unit: &str, reason: impl Into<String>) {
        self.skipped += 1;
        self.issues.push(LoadIssue::new(unit, reason, IssueSeverity::Skip));
    }

    pub fn count_by_severity(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: LoadSummary) {
        self.total += other.total;
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.deleted += other.deleted;
        self.issues.extend(other.issues);
    }

    /// Report the counters at the end of a run
    pub fn log(&self, what: &str) {
        info!(
            total = self.total,
            added = self.added,
            updated = self.updated,
            unchanged = self.unchanged,
            skipped = self.skipped,
            failed = self.failed,
            deleted = self.deleted,
            "{} loaded",
            what
        );
    }
}
