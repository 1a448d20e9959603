//! eBird API 2.0 client
//!
//! Three calls are used by the loaders: the visit list for a region and
//! date, the full detail of one checklist, and the species taxonomy.
//! Requests carry the key in the `X-eBirdApiToken` header and are rate
//! limited with a token bucket.
//!
//! Loaders depend on the [`EbirdApi`] trait so tests can script responses.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

const EBIRD_BASE_URL: &str = "https://api.ebird.org/v2";
const USER_AGENT: &str = concat!("ebird-loader/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// eBird API client errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One entry of the visit list: a checklist submitted in the region on the date.
///
/// `loc` is kept as raw JSON; it is only interpreted when the checklist is
/// loaded, so a malformed location fails that checklist alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Visit {
    #[serde(rename = "subId")]
    pub sub_id: String,
    #[serde(default)]
    pub loc: serde_json::Value,
}

/// One taxonomy entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaxonomyEntry {
    #[serde(rename = "speciesCode")]
    pub species_code: String,
    #[serde(rename = "comName", default)]
    pub common_name: String,
    #[serde(rename = "sciName", default)]
    pub scientific_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "taxonOrder", default)]
    pub taxon_order: Option<serde_json::Number>,
}

#[async_trait]
pub trait EbirdApi: Send + Sync {
    /// Checklists submitted in `region` on `date`, at most `max_results`
    async fn fetch_visits(
        &self,
        region: &str,
        date: NaiveDate,
        max_results: u32,
    ) -> Result<Vec<Visit>, ApiError>;

    /// Full checklist, returned as raw JSON so extraction failures can log it
    async fn fetch_checklist(&self, identifier: &str) -> Result<serde_json::Value, ApiError>;

    /// The complete eBird taxonomy
    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyEntry>, ApiError>;
}

/// eBird API client
pub struct EbirdClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl EbirdClient {
    pub fn new(api_key: &str, requests_per_second: Option<u32>) -> Result<Self, ApiError> {
        Self::with_base_url(EBIRD_BASE_URL, api_key, requests_per_second)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        requests_per_second: Option<u32>,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let per_second = requests_per_second
            .and_then(NonZeroU32::new)
            .or_else(|| NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND))
            .unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Querying eBird API");

        let response = self
            .http_client
            .get(url)
            .header("X-eBirdApiToken", &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl EbirdApi for EbirdClient {
    async fn fetch_visits(
        &self,
        region: &str,
        date: NaiveDate,
        max_results: u32,
    ) -> Result<Vec<Visit>, ApiError> {
        let url = visits_url(&self.base_url, region, date, max_results);
        let visits: Vec<Visit> = self.get_json(&url).await?;

        tracing::info!(region = %region, date = %date, visits = visits.len(), "Fetched visits");
        Ok(visits)
    }

    async fn fetch_checklist(&self, identifier: &str) -> Result<serde_json::Value, ApiError> {
        let url = checklist_url(&self.base_url, identifier);
        self.get_json(&url).await
    }

    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyEntry>, ApiError> {
        let url = format!("{}/ref/taxonomy/ebird?fmt=json", self.base_url);
        let entries: Vec<TaxonomyEntry> = self.get_json(&url).await?;

        tracing::info!(entries = entries.len(), "Fetched taxonomy");
        Ok(entries)
    }
}

fn visits_url(base_url: &str, region: &str, date: NaiveDate, max_results: u32) -> String {
    format!(
        "{}/product/lists/{}/{}/{}/{}?maxResults={}",
        base_url,
        region,
        date.year(),
        date.month(),
        date.day(),
        max_results
    )
}

fn checklist_url(base_url: &str, identifier: &str) -> String {
    format!("{}/product/checklist/view/{}", base_url, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(EbirdClient::new("key", None).is_ok());
        assert!(EbirdClient::new("key", Some(0)).is_ok());
    }

    #[test]
    fn test_visits_url() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            visits_url(EBIRD_BASE_URL, "US-MA", date, 200),
            "https://api.ebird.org/v2/product/lists/US-MA/2024/5/1?maxResults=200"
        );
    }

    #[test]
    fn test_checklist_url() {
        assert_eq!(
            checklist_url(EBIRD_BASE_URL, "S123456"),
            "https://api.ebird.org/v2/product/checklist/view/S123456"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = EbirdClient::with_base_url("http://localhost:8080/v2/", "key", None).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v2");
    }

    #[test]
    fn test_visit_parsing() {
        let visits: Vec<Visit> = serde_json::from_str(
            r#"[{"subId": "S1", "loc": {"locId": "L1"}, "userDisplayName": "A Birder"}]"#,
        )
        .unwrap();

        assert_eq!(visits[0].sub_id, "S1");
        assert_eq!(visits[0].loc["locId"], "L1");
    }

    #[test]
    fn test_taxonomy_parsing() {
        let entries: Vec<TaxonomyEntry> = serde_json::from_str(
            r#"[{"sciName": "Turdus migratorius", "comName": "American Robin",
                 "speciesCode": "amerob", "category": "species", "taxonOrder": 28470.0}]"#,
        )
        .unwrap();

        assert_eq!(entries[0].species_code, "amerob");
        assert_eq!(entries[0].common_name, "American Robin");
        assert!(entries[0].taxon_order.is_some());
    }
}
