//! Database initialization
//!
//! Opens (creating if needed) the SQLite store and creates the five
//! checklist tables. Table creation is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database at `db_path`, creating the file, its parent directory
/// and the schema when missing.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set here apply to every pooled connection, not just the first
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    // Loads run one record at a time; a small pool is plenty
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the schema applied.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// holds exactly one connection and never lets it expire.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all checklist tables and their natural-key indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_species_table(pool).await?;
    create_location_table(pool).await?;
    create_observer_table(pool).await?;
    create_checklist_table(pool).await?;
    create_observation_table(pool).await?;
    Ok(())
}

async fn create_species_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS species (
            id INTEGER PRIMARY KEY,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            edited TEXT,
            identifier TEXT NOT NULL DEFAULT '',
            code TEXT NOT NULL DEFAULT '',
            taxon_order INTEGER,
            category TEXT NOT NULL DEFAULT '',
            common_name TEXT NOT NULL DEFAULT '',
            scientific_name TEXT NOT NULL DEFAULT '',
            local_name TEXT NOT NULL DEFAULT '',
            subspecies_common_name TEXT NOT NULL DEFAULT '',
            subspecies_scientific_name TEXT NOT NULL DEFAULT '',
            subspecies_local_name TEXT NOT NULL DEFAULT '',
            exotic_code TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_species_identifier ON species(identifier)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_species_code ON species(code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_species_taxon_order ON species(taxon_order)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_location_table(pool: &SqlitePool) -> Result<()> {
    // Coordinates are TEXT so the source's decimal precision survives
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS location (
            id INTEGER PRIMARY KEY,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            edited TEXT,
            identifier TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT '',
            county TEXT NOT NULL DEFAULT '',
            county_code TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            state_code TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            country_code TEXT NOT NULL DEFAULT '',
            latitude TEXT,
            longitude TEXT,
            iba_code TEXT NOT NULL DEFAULT '',
            bcr_code TEXT NOT NULL DEFAULT '',
            usfws_code TEXT NOT NULL DEFAULT '',
            atlas_block TEXT NOT NULL DEFAULT '',
            hotspot INTEGER,
            url TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_observer_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observer (
            id INTEGER PRIMARY KEY,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            edited TEXT,
            identifier TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_observer_identifier ON observer(identifier)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_observer_name ON observer(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_checklist_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklist (
            id INTEGER PRIMARY KEY,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            edited TEXT,
            identifier TEXT NOT NULL UNIQUE,
            location_id INTEGER NOT NULL REFERENCES location(id) ON DELETE CASCADE,
            observer_id INTEGER NOT NULL REFERENCES observer(id) ON DELETE CASCADE,
            group_identifier TEXT NOT NULL DEFAULT '',
            observer_count INTEGER,
            species_count INTEGER,
            date TEXT NOT NULL,
            time TEXT,
            protocol TEXT NOT NULL DEFAULT '',
            protocol_code TEXT NOT NULL DEFAULT '',
            project_code TEXT NOT NULL DEFAULT '',
            duration INTEGER,
            distance TEXT,
            area TEXT,
            complete INTEGER,
            comments TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_checklist_location ON checklist(location_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_checklist_observer ON checklist(observer_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_observation_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observation (
            id INTEGER PRIMARY KEY,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            edited TEXT,
            identifier TEXT NOT NULL DEFAULT '',
            checklist_id INTEGER NOT NULL REFERENCES checklist(id) ON DELETE CASCADE,
            species_id INTEGER NOT NULL REFERENCES species(id) ON DELETE CASCADE,
            count INTEGER,
            breeding_code TEXT NOT NULL DEFAULT '',
            breeding_category TEXT NOT NULL DEFAULT '',
            behavior_code TEXT NOT NULL DEFAULT '',
            age_sex TEXT NOT NULL DEFAULT '',
            media INTEGER,
            approved INTEGER,
            reviewed INTEGER,
            reason TEXT NOT NULL DEFAULT '',
            comments TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_observation_identifier ON observation(identifier)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_observation_checklist ON observation(checklist_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_observation_species ON observation(species_id)")
        .execute(pool)
        .await?;

    Ok(())
}
