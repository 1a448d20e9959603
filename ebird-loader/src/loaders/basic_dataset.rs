//! eBird Basic Dataset loader
//!
//! Streams a tab-delimited EBD extract one row at a time. Each row is an
//! observation; its checklist's status (new, modified, unchanged) decides
//! whether anything is written. Rows of new or modified checklists reconcile
//! Location, Observer, Species, Checklist and Observation in one
//! transaction, committed per row.

use csv::{ReaderBuilder, StringRecord};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info};

use super::{checklist_status, failed, require_file, RecordStatus};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::extractors::basic_dataset::{self as extract, BasicDatasetRow};
use crate::models::{LoadSummary, RecordOutcome};
use crate::reconcile::{reconcile, Revision};

pub struct BasicDatasetLoader {
    pool: SqlitePool,
    config: LoaderConfig,
}

impl BasicDatasetLoader {
    pub fn new(pool: SqlitePool, config: LoaderConfig) -> Self {
        Self { pool, config }
    }

    /// Load every row of the file at `path`.
    ///
    /// A missing file or unreadable header fails the run; a bad row is
    /// logged, counted as failed, and the run continues.
    pub async fn load(&self, path: &Path) -> LoaderResult<LoadSummary> {
        require_file(path)?;

        info!("Loading eBird Basic Dataset from {}", path.display());

        // EBD fields are never quoted and may contain stray quote characters
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        // Status of each checklist as first seen in this run. Later rows of a
        // new checklist must not be mistaken for unchanged ones.
        let mut statuses: HashMap<String, RecordStatus> = HashMap::new();
        let mut summary = LoadSummary::new();

        for (index, record) in reader.records().enumerate() {
            // Line 1 is the header
            let line = index + 2;
            let unit = format!("row {}", line);

            let outcome = match record {
                Ok(record) => match self.load_record(&record, &headers, &mut statuses).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(
                            row = line,
                            error = %e,
                            record = %raw_record(&record),
                            "Row not loaded"
                        );
                        failed(&e)
                    }
                },
                Err(e) => {
                    error!(row = line, error = %e, "Row could not be read");
                    failed(&LoaderError::from(e))
                }
            };

            summary.record(&unit, outcome);

            if self.config.report_progress(summary.total) {
                info!(rows = summary.total, "Records loaded");
            }
        }

        summary.log("Basic Dataset rows");
        Ok(summary)
    }

    async fn load_record(
        &self,
        record: &StringRecord,
        headers: &StringRecord,
        statuses: &mut HashMap<String, RecordStatus>,
    ) -> LoaderResult<RecordOutcome> {
        let row: BasicDatasetRow = record.deserialize(Some(headers))?;
        self.load_row(&row, statuses).await
    }

    async fn load_row(
        &self,
        row: &BasicDatasetRow,
        statuses: &mut HashMap<String, RecordStatus>,
    ) -> LoaderResult<RecordOutcome> {
        let edited = extract::revision(row)?;
        let revision = Revision::Tracked(edited);
        let policy = self.config.key_policy;

        let mut tx = self.pool.begin().await?;

        let status = match statuses.get(&row.sampling_event_identifier) {
            Some(status) => *status,
            None => checklist_status(&mut tx, &row.sampling_event_identifier, edited).await?,
        };

        if status == RecordStatus::Unchanged {
            statuses.insert(row.sampling_event_identifier.clone(), status);
            return Ok(status.outcome());
        }

        let (key, fields) = extract::location(row)?;
        let location = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::observer(row);
        let observer = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::species(row)?;
        let species = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::checklist(row, location.id, observer.id)?;
        let checklist = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::observation(row, checklist.id, species.id)?;
        let observation = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        tx.commit().await?;

        debug!(
            checklist = %row.sampling_event_identifier,
            observation = %row.global_unique_identifier,
            outcome = ?observation.outcome,
            "Row loaded"
        );

        statuses.insert(row.sampling_event_identifier.clone(), status);
        Ok(status.outcome())
    }
}

fn raw_record(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join("\t")
}
