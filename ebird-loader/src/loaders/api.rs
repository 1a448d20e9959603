//! eBird API loader
//!
//! For each region and date: fetch the visit list, then fetch and reconcile
//! every listed checklist. A checklist whose stored revision is older is
//! refreshed and then swept: observations it no longer reports (their
//! revision was not advanced by the refresh) are deleted.
//!
//! Fault isolation:
//! - Visit list fetch fails: the region/date is skipped.
//! - Checklist fetch fails: that checklist is skipped.
//! - Checklist fails to load: its savepoint is rolled back, it is counted
//!   as failed and logged with its payload.
//! - One observation fails: its nested savepoint is rolled back and the
//!   remaining observations still load.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ebird_common::db::Table;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use super::{checklist_status, failed, RecordStatus};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::extractors::api as extract;
use crate::models::{LoadSummary, RecordOutcome};
use crate::reconcile::{find_by_key, reconcile, NaturalKey, Revision};
use crate::services::ebird_client::{EbirdApi, Visit};

/// `days` dates ending with `today`, newest first
pub fn recent_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..i64::from(days))
        .map(|offset| today - Duration::days(offset))
        .collect()
}

pub struct ApiLoader<A: EbirdApi> {
    api: A,
    pool: SqlitePool,
    config: LoaderConfig,
}

impl<A: EbirdApi> ApiLoader<A> {
    pub fn new(api: A, pool: SqlitePool, config: LoaderConfig) -> Self {
        Self { api, pool, config }
    }

    /// Load every region for every date
    pub async fn load(&self, regions: &[String], dates: &[NaiveDate]) -> LoaderResult<LoadSummary> {
        let mut summary = LoadSummary::new();

        for region in regions {
            for date in dates {
                summary.merge(self.load_region(region, *date).await?);
            }
        }

        summary.log("API checklists");
        Ok(summary)
    }

    /// Load the checklists submitted in one region on one date.
    ///
    /// Everything for the region/date commits together; only database
    /// failures outside a savepoint end the run.
    pub async fn load_region(&self, region: &str, date: NaiveDate) -> LoaderResult<LoadSummary> {
        let mut summary = LoadSummary::new();
        let unit = format!("{} {}", region, date);

        info!(region = %region, date = %date, max_results = self.config.max_results, "Fetching visits");

        let visits = match self
            .api
            .fetch_visits(region, date, self.config.max_results)
            .await
        {
            Ok(visits) => visits,
            Err(e) => {
                warn!(region = %region, date = %date, error = %e, "Visits not fetched");
                summary.skip_unit(&unit, e.to_string());
                return Ok(summary);
            }
        };

        let mut tx = self.pool.begin().await?;

        for visit in &visits {
            let raw = match self.api.fetch_checklist(&visit.sub_id).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(checklist = %visit.sub_id, error = %e, "Checklist not fetched");
                    summary.record(
                        &visit.sub_id,
                        RecordOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            // Warnings and deletions only count once the savepoint commits
            let mut pending = LoadSummary::new();
            let mut savepoint = sqlx::Connection::begin(&mut *tx).await?;

            match self
                .load_checklist(&mut savepoint, visit, &raw, &mut pending)
                .await
            {
                Ok(outcome) => {
                    savepoint.commit().await?;
                    summary.merge(pending);
                    summary.record(&visit.sub_id, outcome);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    error!(
                        checklist = %visit.sub_id,
                        error = %e,
                        payload = %raw,
                        "Checklist not loaded"
                    );
                    summary.record(&visit.sub_id, failed(&e));
                }
            }
        }

        tx.commit().await?;

        info!(
            region = %region,
            date = %date,
            fetched = summary.total,
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "Region loaded"
        );

        Ok(summary)
    }

    async fn load_checklist(
        &self,
        conn: &mut SqliteConnection,
        visit: &Visit,
        raw: &serde_json::Value,
        pending: &mut LoadSummary,
    ) -> LoaderResult<RecordOutcome> {
        let checklist = extract::parse_checklist(raw)?;
        let edited = extract::revision(&checklist)?;
        let policy = self.config.key_policy;

        let status = checklist_status(&mut *conn, &visit.sub_id, edited).await?;
        if status == RecordStatus::Unchanged {
            return Ok(status.outcome());
        }

        let revision = Revision::Tracked(edited);

        let (key, fields) = extract::location(&visit.loc)?;
        let location = reconcile(&mut *conn, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::observer(&checklist);
        let observer = reconcile(&mut *conn, policy, &key, revision, &fields).await?;

        let (key, fields) = extract::checklist(&checklist, location.id, observer.id)?;
        let stored = reconcile(&mut *conn, policy, &key, revision, &fields).await?;

        for raw_observation in &checklist.obs {
            let mut savepoint = sqlx::Connection::begin(&mut *conn).await?;

            match self
                .load_observation(&mut savepoint, raw_observation, stored.id, revision)
                .await
            {
                Ok(()) => savepoint.commit().await?,
                Err(e) => {
                    savepoint.rollback().await?;
                    error!(
                        checklist = %visit.sub_id,
                        error = %e,
                        observation = %raw_observation,
                        "Observation not added"
                    );
                    pending.warn(&visit.sub_id, format!("Observation not added: {}", e));
                }
            }
        }

        if status == RecordStatus::Modified {
            pending.deleted += delete_orphans(&mut *conn, stored.id, edited).await?;
        }

        Ok(status.outcome())
    }

    async fn load_observation(
        &self,
        conn: &mut SqliteConnection,
        raw: &serde_json::Value,
        checklist_id: i64,
        revision: Revision,
    ) -> LoaderResult<()> {
        let observation = extract::parse_observation(raw)?;

        // Species come from the taxonomy load; they are never created here
        let species_key = NaturalKey::Code(observation.species_code.clone());
        let species = find_by_key(&mut *conn, Table::Species, &species_key)
            .await?
            .ok_or_else(|| LoaderError::UnknownSpecies(observation.species_code.clone()))?;

        let (key, fields) = extract::observation(&observation, checklist_id, species.id)?;
        reconcile(&mut *conn, self.config.key_policy, &key, revision, &fields).await?;

        Ok(())
    }
}

/// Delete the checklist's observations whose revision predates `edited`.
///
/// Called after a refresh has advanced every observation still present in
/// the payload to `edited`, so whatever is older was withdrawn upstream.
pub async fn delete_orphans(
    conn: &mut SqliteConnection,
    checklist_id: i64,
    edited: NaiveDateTime,
) -> LoaderResult<usize> {
    let rows = sqlx::query(
        "SELECT id, identifier, species_id, count, edited FROM observation WHERE checklist_id = ? ORDER BY id",
    )
    .bind(checklist_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut deleted = 0;

    for row in rows {
        let observation_edited: Option<NaiveDateTime> = row.try_get("edited")?;
        if !Revision::Tracked(edited).supersedes(observation_edited) {
            continue;
        }

        let id: i64 = row.try_get("id")?;
        sqlx::query("DELETE FROM observation WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let identifier: String = row.try_get("identifier")?;
        let species_id: i64 = row.try_get("species_id")?;
        let count: Option<i64> = row.try_get("count")?;
        info!(
            checklist_id,
            observation = %identifier,
            species_id,
            count = ?count,
            "Observation deleted"
        );

        deleted += 1;
    }

    debug!(checklist_id, deleted, "Orphan sweep complete");
    Ok(deleted)
}
