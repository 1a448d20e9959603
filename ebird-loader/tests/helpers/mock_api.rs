//! Scripted eBird API
//!
//! Every visit list query returns the same scripted visits; checklist
//! details are served from a map keyed by submission id.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use ebird_loader::services::ebird_client::{ApiError, EbirdApi, TaxonomyEntry, Visit};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct MockApi {
    visits: Vec<Visit>,
    checklists: HashMap<String, Value>,
    unfetchable: HashSet<String>,
    visits_fail: bool,
    taxonomy: Option<Vec<TaxonomyEntry>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a visit at `location` and serve `payload` as its detail
    pub fn checklist(mut self, location: Value, payload: Value) -> Self {
        let sub_id = payload["subId"].as_str().unwrap_or_default().to_string();
        self.visits.push(Visit {
            sub_id: sub_id.clone(),
            loc: location,
        });
        self.checklists.insert(sub_id, payload);
        self
    }

    /// List a visit whose detail request fails
    pub fn unfetchable(mut self, sub_id: &str) -> Self {
        self.visits.push(Visit {
            sub_id: sub_id.to_string(),
            loc: location_json("L1", "Pond"),
        });
        self.unfetchable.insert(sub_id.to_string());
        self
    }

    /// Make every visit list request fail
    pub fn visits_fail(mut self) -> Self {
        self.visits_fail = true;
        self
    }

    pub fn taxonomy(mut self, entries: Vec<TaxonomyEntry>) -> Self {
        self.taxonomy = Some(entries);
        self
    }
}

#[async_trait]
impl EbirdApi for MockApi {
    async fn fetch_visits(
        &self,
        _region: &str,
        _date: NaiveDate,
        max_results: u32,
    ) -> Result<Vec<Visit>, ApiError> {
        if self.visits_fail {
            return Err(ApiError::Status(503, "Service Unavailable".to_string()));
        }

        Ok(self.visits.iter().take(max_results as usize).cloned().collect())
    }

    async fn fetch_checklist(&self, identifier: &str) -> Result<Value, ApiError> {
        if self.unfetchable.contains(identifier) {
            return Err(ApiError::Network("connection reset".to_string()));
        }

        self.checklists
            .get(identifier)
            .cloned()
            .ok_or_else(|| ApiError::Status(404, identifier.to_string()))
    }

    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyEntry>, ApiError> {
        self.taxonomy
            .clone()
            .ok_or_else(|| ApiError::Network("timed out".to_string()))
    }
}

pub fn location_json(loc_id: &str, name: &str) -> Value {
    json!({
        "locId": loc_id,
        "name": name,
        "latitude": 42.3601,
        "longitude": -71.0589,
        "countryCode": "US",
        "countryName": "United States",
        "subnational1Code": "US-MA",
        "subnational1Name": "Massachusetts",
        "isHotspot": false
    })
}

/// Checklist detail with one entry per `(species code, obs id, count)`
pub fn checklist_json(sub_id: &str, edited: NaiveDateTime, obs: &[(&str, &str, &str)]) -> Value {
    let obs: Vec<Value> = obs
        .iter()
        .map(|(species, obs_id, count)| {
            json!({
                "speciesCode": species,
                "howManyStr": count,
                "obsId": obs_id,
                "projId": "EBIRD"
            })
        })
        .collect();

    json!({
        "subId": sub_id,
        "lastEditedDt": edited.format("%Y-%m-%d %H:%M:%S").to_string(),
        "obsDt": "2024-05-01 07:30",
        "obsTimeValid": true,
        "userDisplayName": "A Birder",
        "numObservers": 1,
        "numSpecies": obs.len(),
        "protocolId": "P22",
        "projId": "EBIRD",
        "durationHrs": 1.5,
        "distKm": 2.0,
        "allObsReported": true,
        "obs": obs
    })
}
