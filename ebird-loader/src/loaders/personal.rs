//! Personal "Download My Data" loader
//!
//! The export is one observer's record, so the observer is resolved once
//! for the whole file. Nothing in the export carries a revision and
//! observations have no identifier: every row overwrites its location,
//! species and checklist, and always inserts a new observation. Loading the
//! same file twice duplicates its observations.

use csv::{ReaderBuilder, StringRecord};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, error, info};

use super::{failed, require_file};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::extractors::personal::{self as extract, PersonalRow};
use crate::models::{LoadSummary, RecordOutcome};
use crate::reconcile::{create, reconcile, Revision};

pub struct PersonalDataLoader {
    pool: SqlitePool,
    config: LoaderConfig,
}

impl PersonalDataLoader {
    pub fn new(pool: SqlitePool, config: LoaderConfig) -> Self {
        Self { pool, config }
    }

    /// Load the export at `path` as the observations of `observer_name`
    pub async fn load(&self, path: &Path, observer_name: &str) -> LoaderResult<LoadSummary> {
        require_file(path)?;

        info!(observer = %observer_name, "Loading personal export from {}", path.display());

        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();

        let observer_id = self.resolve_observer(observer_name).await?;
        let mut summary = LoadSummary::new();

        for (index, record) in reader.records().enumerate() {
            let line = index + 2;
            let unit = format!("row {}", line);

            let outcome = match record {
                Ok(record) => match self.load_record(&record, &headers, observer_id).await {
                    Ok(()) => RecordOutcome::Added,
                    Err(e) => {
                        error!(
                            row = line,
                            error = %e,
                            record = %record.iter().collect::<Vec<_>>().join(","),
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

        summary.log("Personal export rows");
        Ok(summary)
    }

    async fn resolve_observer(&self, name: &str) -> LoaderResult<i64> {
        let mut tx = self.pool.begin().await?;

        let (key, fields) = extract::observer(name);
        let observer = reconcile(&mut tx, self.config.key_policy, &key, Revision::Untracked, &fields)
            .await?;

        tx.commit().await?;

        debug!(observer = %name, id = observer.id, outcome = ?observer.outcome, "Observer resolved");
        Ok(observer.id)
    }

    async fn load_record(
        &self,
        record: &StringRecord,
        headers: &StringRecord,
        observer_id: i64,
    ) -> LoaderResult<()> {
        let row: PersonalRow = record.deserialize(Some(headers))?;
        self.load_row(&row, observer_id).await
    }

    async fn load_row(&self, row: &PersonalRow, observer_id: i64) -> LoaderResult<()> {
        let policy = self.config.key_policy;
        let revision = Revision::Untracked;

        let mut tx = self.pool.begin().await?;

        let (key, fields) = extract::location(row)?;
        let location = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::checklist(row, location.id, observer_id)?;
        let checklist = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::species(row)?;
        let species = reconcile(&mut tx, policy, &key, revision, &fields).await?;

        let fields = extract::observation(row, checklist.id, species.id)?;
        let id = create(&mut tx, None, revision, &fields).await?;

        tx.commit().await?;

        debug!(checklist = %row.submission_id, observation = id, "Row loaded");
        Ok(())
    }
}
