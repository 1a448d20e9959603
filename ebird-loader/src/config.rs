//! Loader settings
//!
//! Resolved once from [`AppConfig`] and passed to each loader's constructor.

use ebird_common::config::{AppConfig, KeyPolicy, MAX_API_RESULTS};

/// Rows between progress log lines
const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub key_policy: KeyPolicy,
    /// Visits requested per region and date
    pub max_results: u32,
    pub progress_interval: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::default(),
            max_results: MAX_API_RESULTS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl From<&AppConfig> for LoaderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            key_policy: config.key_policy,
            max_results: config.max_results.min(MAX_API_RESULTS),
            ..Default::default()
        }
    }
}

impl LoaderConfig {
    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    pub(crate) fn report_progress(&self, processed: usize) -> bool {
        self.progress_interval > 0 && processed % self.progress_interval == 0
    }
}
