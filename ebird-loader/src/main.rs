//! ebird-loader - load eBird checklists into a local SQLite database
//!
//! Sources:
//! - `basic`: an eBird Basic Dataset extract (tab delimited)
//! - `api`: recent checklists from the eBird API, per region and date
//! - `taxonomy`: the eBird species taxonomy
//! - `personal`: one observer's "Download My Data" export

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use ebird_common::config::{load_toml_config, AppConfig, ConfigOverrides, LoggingConfig};
use ebird_common::db::init_database;
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ebird_loader::config::LoaderConfig;
use ebird_loader::loaders::api::recent_dates;
use ebird_loader::loaders::{
    ApiLoader, BasicDatasetLoader, PersonalDataLoader, SpeciesTaxonomyLoader,
};
use ebird_loader::models::LoadSummary;
use ebird_loader::services::ebird_client::EbirdClient;

/// Command-line arguments for ebird-loader
#[derive(Parser, Debug)]
#[command(name = "ebird-loader")]
#[command(about = "Load eBird checklists into a local database")]
#[command(version)]
struct Args {
    /// TOML configuration file (falls back to `EBIRD_CONFIG`, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Reject records whose natural key is empty
    #[arg(long, global = true)]
    strict_keys: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load an eBird Basic Dataset extract
    Basic {
        /// Tab-delimited extract
        path: PathBuf,
    },

    /// Load recent checklists from the eBird API
    Api {
        /// Region code such as US-MA (repeatable)
        #[arg(long = "region")]
        regions: Vec<String>,

        /// Number of days to load, ending today
        #[arg(long)]
        days: Option<u32>,

        /// Load these dates instead of the most recent days (repeatable)
        #[arg(long = "date")]
        dates: Vec<NaiveDate>,
    },

    /// Load the eBird species taxonomy into an empty species table
    Taxonomy,

    /// Load a personal "Download My Data" export
    Personal {
        /// Comma-delimited export
        path: PathBuf,

        /// Name the observations are recorded under
        #[arg(long)]
        observer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut overrides = ConfigOverrides {
        config_file: args.config.clone(),
        database_path: args.database.clone(),
        strict_keys: args.strict_keys,
        ..Default::default()
    };
    if let Command::Api { regions, days, .. } = &args.command {
        overrides.regions = regions.clone();
        overrides.past_days = *days;
    }

    let toml_config = load_toml_config(overrides.config_file.as_deref())
        .context("Failed to load configuration")?;
    let config = AppConfig::resolve(&overrides, toml_config)
        .context("Invalid configuration")?;

    init_logging(&config.logging)?;

    info!("Starting ebird-loader {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let loader_config = LoaderConfig::from(&config);

    let summary = match args.command {
        Command::Basic { path } => load_basic(pool, loader_config, &path).await?,
        Command::Api { dates, .. } => load_api(pool, loader_config, &config, dates).await?,
        Command::Taxonomy => load_taxonomy(pool, &config).await?,
        Command::Personal { path, observer } => {
            load_personal(pool, loader_config, &path, &observer).await?
        }
    };

    // Counters were logged by the loader; stdout gets the full summary
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );

    Ok(())
}

/// Install the subscriber; `RUST_LOG` takes precedence over the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = logging
        .file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

async fn load_basic(pool: SqlitePool, config: LoaderConfig, path: &Path) -> Result<LoadSummary> {
    BasicDatasetLoader::new(pool, config)
        .load(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}

async fn load_api(
    pool: SqlitePool,
    loader_config: LoaderConfig,
    config: &AppConfig,
    dates: Vec<NaiveDate>,
) -> Result<LoadSummary> {
    if config.regions.is_empty() {
        bail!("No regions configured: pass --region, set EBIRD_API_REGIONS or api_regions");
    }

    let api_key = config.require_api_key()?;
    let client = EbirdClient::new(api_key, config.requests_per_second)
        .context("Failed to create eBird API client")?;

    let dates = if dates.is_empty() {
        recent_dates(Utc::now().date_naive(), config.past_days)
    } else {
        dates
    };

    ApiLoader::new(client, pool, loader_config)
        .load(&config.regions, &dates)
        .await
        .context("Failed to load API checklists")
}

async fn load_taxonomy(pool: SqlitePool, config: &AppConfig) -> Result<LoadSummary> {
    let api_key = config.require_api_key()?;
    let client = EbirdClient::new(api_key, config.requests_per_second)
        .context("Failed to create eBird API client")?;

    SpeciesTaxonomyLoader::new(client, pool)
        .load()
        .await
        .context("Failed to load taxonomy")
}

async fn load_personal(
    pool: SqlitePool,
    config: LoaderConfig,
    path: &Path,
    observer: &str,
) -> Result<LoadSummary> {
    PersonalDataLoader::new(pool, config)
        .load(path, observer)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}
