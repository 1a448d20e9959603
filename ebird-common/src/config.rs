//! Configuration loading and resolution
//!
//! Settings come from four places, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`EBIRD_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults
//! are used. A TOML file that exists but does not parse is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

const APP_DIR: &str = "ebird-checklists";
const DATABASE_FILE: &str = "checklists.sqlite3";

pub const ENV_CONFIG: &str = "EBIRD_CONFIG";
pub const ENV_DATABASE: &str = "EBIRD_DATABASE";
pub const ENV_API_KEY: &str = "EBIRD_API_KEY";
pub const ENV_API_REGIONS: &str = "EBIRD_API_REGIONS";
pub const ENV_API_PAST_DAYS: &str = "EBIRD_API_PAST_DAYS";
pub const ENV_EMPTY_KEY_POLICY: &str = "EBIRD_EMPTY_KEY_POLICY";

/// Days fetched from the API when nothing else is configured
pub const DEFAULT_PAST_DAYS: u32 = 5;

/// Largest visit page the eBird API returns
pub const MAX_API_RESULTS: u32 = 200;

/// How empty-string natural keys are treated during lookup.
///
/// Observers loaded from the API or a personal export have no identifier,
/// and taxonomy species have none either, so all of them share the key `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Empty keys are looked up like any other value and match each other
    #[default]
    Legacy,
    /// Empty keys are rejected and the record fails
    Strict,
}

impl FromStr for KeyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(KeyPolicy::Legacy),
            "strict" => Ok(KeyPolicy::Strict),
            other => Err(Error::Config(format!(
                "Unknown empty key policy '{}' (expected 'legacy' or 'strict')",
                other
            ))),
        }
    }
}

/// Configuration read from the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// eBird API 2.0 key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Region codes loaded by the API loader (e.g. `US-MA`, `PT-11`)
    #[serde(default)]
    pub api_regions: Vec<String>,

    /// Number of days, counting today, fetched per region
    #[serde(default)]
    pub api_past_days: Option<u32>,

    /// Visits requested per region and date (capped at 200)
    #[serde(default)]
    pub api_max_results: Option<u32>,

    /// Upper bound on API requests per second
    #[serde(default)]
    pub api_requests_per_second: Option<u32>,

    #[serde(default)]
    pub empty_key_policy: KeyPolicy,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub regions: Vec<String>,
    pub past_days: Option<u32>,
    pub strict_keys: bool,
}

/// Default location of the TOML file: `<config dir>/ebird-checklists/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Default database location: `<local data dir>/ebird-checklists/checklists.sqlite3`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./ebird_data"))
        .join(DATABASE_FILE)
}

/// Load the TOML file named on the command line, by `EBIRD_CONFIG`, or at
/// the default location.
pub fn load_toml_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match cli_path {
        Some(path) => Some(path.to_path_buf()),
        None => non_blank_env(ENV_CONFIG)
            .map(PathBuf::from)
            .or_else(default_config_path),
    };

    let Some(path) = path else {
        warn!("Could not determine configuration directory, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file not found: {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub api_key: Option<String>,
    pub regions: Vec<String>,
    pub past_days: u32,
    pub max_results: u32,
    pub requests_per_second: Option<u32>,
    pub key_policy: KeyPolicy,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Merge command-line overrides, environment and TOML into one value.
    ///
    /// A missing API key is not an error here; loaders that talk to the API
    /// ask for it through [`AppConfig::require_api_key`].
    pub fn resolve(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let database_path = resolve_database_path(overrides.database_path.as_deref(), &toml_config);
        let api_key = resolve_api_key(&toml_config);
        let regions = resolve_regions(&overrides.regions, &toml_config);
        let past_days = resolve_past_days(overrides.past_days, &toml_config)?;
        let key_policy = resolve_key_policy(overrides.strict_keys, &toml_config)?;

        let max_results = toml_config.api_max_results.unwrap_or(MAX_API_RESULTS);
        if max_results == 0 || max_results > MAX_API_RESULTS {
            return Err(Error::Config(format!(
                "api_max_results must be between 1 and {}, got {}",
                MAX_API_RESULTS, max_results
            )));
        }

        Ok(Self {
            database_path,
            api_key,
            regions,
            past_days,
            max_results,
            requests_per_second: toml_config.api_requests_per_second,
            key_policy,
            logging: toml_config.logging,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "eBird API key not configured. Set one of:\n\
                 1. Environment: {}=your-key-here\n\
                 2. TOML config: api_key = \"your-key\"\n\
                 \n\
                 Request a key at: https://ebird.org/api/keygen",
                ENV_API_KEY
            ))
        })
    }
}

/// Database path: CLI > `EBIRD_DATABASE` > TOML > default
pub fn resolve_database_path(cli_path: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }

    if let Some(path) = non_blank_env(ENV_DATABASE) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// API key: `EBIRD_API_KEY` > TOML. Blank keys are ignored.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = non_blank_env(ENV_API_KEY);
    let toml_key = toml_config
        .api_key
        .as_ref()
        .filter(|key| is_valid_key(key))
        .cloned();

    if env_key.is_some() && toml_key.is_some() {
        warn!("eBird API key found in environment and TOML config. Using environment.");
    }

    if env_key.is_some() {
        info!("eBird API key loaded from environment variable");
        return env_key;
    }

    if toml_key.is_some() {
        info!("eBird API key loaded from TOML config");
    }
    toml_key
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Regions: CLI > `EBIRD_API_REGIONS` (comma separated) > TOML
pub fn resolve_regions(cli_regions: &[String], toml_config: &TomlConfig) -> Vec<String> {
    if !cli_regions.is_empty() {
        return cli_regions.to_vec();
    }

    if let Some(value) = non_blank_env(ENV_API_REGIONS) {
        return split_list(&value);
    }

    toml_config
        .api_regions
        .iter()
        .map(|region| region.trim().to_string())
        .filter(|region| !region.is_empty())
        .collect()
}

/// Days to fetch: CLI > `EBIRD_API_PAST_DAYS` > TOML > 5
pub fn resolve_past_days(cli_days: Option<u32>, toml_config: &TomlConfig) -> Result<u32> {
    let days = match cli_days {
        Some(days) => days,
        None => match non_blank_env(ENV_API_PAST_DAYS) {
            Some(value) => value.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!("{}={:?}: {}", ENV_API_PAST_DAYS, value, e))
            })?,
            None => toml_config.api_past_days.unwrap_or(DEFAULT_PAST_DAYS),
        },
    };

    if days == 0 {
        return Err(Error::Config("api_past_days must be at least 1".to_string()));
    }
    Ok(days)
}

/// Empty key policy: `--strict-keys` > `EBIRD_EMPTY_KEY_POLICY` > TOML > legacy
pub fn resolve_key_policy(cli_strict: bool, toml_config: &TomlConfig) -> Result<KeyPolicy> {
    if cli_strict {
        return Ok(KeyPolicy::Strict);
    }

    match non_blank_env(ENV_EMPTY_KEY_POLICY) {
        Some(value) => value.parse(),
        None => Ok(toml_config.empty_key_policy),
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
