//! eBird species taxonomy loader
//!
//! Seeds the species table from the API taxonomy. Entries are inserted
//! without a lookup, so this is meant for an empty table; running it twice
//! duplicates every species.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::failed;
use crate::error::LoaderResult;
use crate::extractors::taxon_order;
use crate::models::{LoadSummary, RecordOutcome};
use crate::reconcile::{create, Revision, SpeciesFields};
use crate::services::ebird_client::{EbirdApi, TaxonomyEntry};

pub struct SpeciesTaxonomyLoader<A: EbirdApi> {
    api: A,
    pool: SqlitePool,
}

impl<A: EbirdApi> SpeciesTaxonomyLoader<A> {
    pub fn new(api: A, pool: SqlitePool) -> Self {
        Self { api, pool }
    }

    pub async fn load(&self) -> LoaderResult<LoadSummary> {
        let mut summary = LoadSummary::new();

        info!("Fetching eBird taxonomy");

        let entries = match self.api.fetch_taxonomy().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Taxonomy not fetched");
                summary.skip_unit("taxonomy", e.to_string());
                return Ok(summary);
            }
        };

        info!(entries = entries.len(), "Taxonomy fetched");

        let mut tx = self.pool.begin().await?;

        for entry in &entries {
            let outcome = match species(entry) {
                Ok(fields) => match create(&mut tx, None, Revision::Untracked, &fields).await {
                    Ok(_) => RecordOutcome::Added,
                    Err(e) => {
                        error!(species = %entry.species_code, error = %e, "Species not added");
                        failed(&e)
                    }
                },
                Err(e) => {
                    error!(species = %entry.species_code, error = %e, "Species not added");
                    failed(&e)
                }
            };

            summary.record(&entry.species_code, outcome);
        }

        tx.commit().await?;

        summary.log("Species");
        Ok(summary)
    }
}

fn species(entry: &TaxonomyEntry) -> LoaderResult<SpeciesFields> {
    let order = entry.taxon_order.as_ref().map(|n| n.to_string());

    Ok(SpeciesFields {
        code: Some(entry.species_code.clone()),
        taxon_order: Some(taxon_order(order.as_deref())?),
        category: Some(entry.category.clone()),
        common_name: Some(entry.common_name.clone()),
        scientific_name: Some(entry.scientific_name.clone()),
        ..Default::default()
    })
}
