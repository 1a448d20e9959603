//! Basic Dataset loader tests
//!
//! Each test writes a small extract to a temp dir and loads it into an
//! in-memory database.

mod helpers;

use ebird_common::config::KeyPolicy;
use ebird_common::db::init_memory_database;
use ebird_common::db::models::{count_rows, Checklist, Location, Observation, Observer, Table};
use ebird_loader::config::LoaderConfig;
use ebird_loader::loaders::BasicDatasetLoader;
use ebird_loader::models::IssueSeverity;
use ebird_loader::LoaderError;
use helpers::{at, write_tsv, BulkRow};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn load(pool: &SqlitePool, rows: &[BulkRow]) -> ebird_loader::models::LoadSummary {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(dir.path(), rows);

    BasicDatasetLoader::new(pool.clone(), LoaderConfig::default())
        .load(&path)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_row_creates_one_of_each() {
    let pool = init_memory_database().await.unwrap();

    let summary = load(&pool, &[BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00")]).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.added, 1);
    for table in Table::ALL {
        assert_eq!(count_rows(&pool, table).await.unwrap(), 1, "{} rows", table);
    }

    let location = Location::find_by_identifier(&pool, "L1").await.unwrap().unwrap();
    assert_eq!(location.audit.created, location.audit.modified);
    assert_eq!(location.audit.edited, Some(at(10)));
    assert_eq!(location.hotspot, Some(true));
    assert_eq!(location.latitude.unwrap().to_string(), "42.3434100");

    let checklist = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    assert_eq!(checklist.audit.created, checklist.audit.modified);
    assert_eq!(checklist.location_id, location.audit.id);
    assert_eq!(checklist.duration, Some(60));
    assert_eq!(checklist.complete, Some(true));

    let observation = Observation::find_by_identifier(&pool, "G1").await.unwrap().unwrap();
    assert_eq!(observation.audit.created, observation.audit.modified);
    assert_eq!(observation.checklist_id, checklist.audit.id);
    assert_eq!(observation.count, Some(2));

    let observer = Observer::find_by_identifier(&pool, "obsr1").await.unwrap().unwrap();
    assert_eq!(observer.name, "");
}

#[tokio::test]
async fn test_reload_is_unchanged() {
    let pool = init_memory_database().await.unwrap();
    let rows = [BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00")];

    load(&pool, &rows).await;
    let before = Observation::find_by_identifier(&pool, "G1").await.unwrap().unwrap();

    let summary = load(&pool, &rows).await;
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.added, 0);
    assert_eq!(summary.updated, 0);

    let after = Observation::find_by_identifier(&pool, "G1").await.unwrap().unwrap();
    assert_eq!(before.audit.modified, after.audit.modified);
    assert_eq!(count_rows(&pool, Table::Observation).await.unwrap(), 1);
}

#[tokio::test]
async fn test_newer_revision_updates_checklist() {
    let pool = init_memory_database().await.unwrap();

    load(&pool, &[BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00")]).await;

    let summary = load(
        &pool,
        &[BulkRow::bulk("G1", "S1", "2024-05-01 11:00:00").set("OBSERVATION COUNT", "5")],
    )
    .await;
    assert_eq!(summary.updated, 1);

    let observation = Observation::find_by_identifier(&pool, "G1").await.unwrap().unwrap();
    assert_eq!(observation.count, Some(5));
    assert_eq!(observation.audit.edited, Some(at(11)));
    assert!(observation.audit.modified > observation.audit.created);
}

#[tokio::test]
async fn test_location_takes_newest_name() {
    let pool = init_memory_database().await.unwrap();

    let summary = load(
        &pool,
        &[
            BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00").set("LOCALITY", "Old Name"),
            BulkRow::bulk("G2", "S2", "2024-05-01 11:00:00").set("LOCALITY", "New Name"),
        ],
    )
    .await;
    assert_eq!(summary.added, 2);

    assert_eq!(count_rows(&pool, Table::Location).await.unwrap(), 1);
    let location = Location::find_by_identifier(&pool, "L1").await.unwrap().unwrap();
    assert_eq!(location.name, "New Name");
    assert_eq!(location.audit.edited, Some(at(11)));
}

#[tokio::test]
async fn test_older_row_does_not_rename_location() {
    let pool = init_memory_database().await.unwrap();

    load(
        &pool,
        &[
            BulkRow::bulk("G1", "S1", "2024-05-01 11:00:00").set("LOCALITY", "New Name"),
            BulkRow::bulk("G2", "S2", "2024-05-01 10:00:00").set("LOCALITY", "Old Name"),
        ],
    )
    .await;

    let location = Location::find_by_identifier(&pool, "L1").await.unwrap().unwrap();
    assert_eq!(location.name, "New Name");
    assert_eq!(count_rows(&pool, Table::Checklist).await.unwrap(), 2);
}

#[tokio::test]
async fn test_every_row_of_new_checklist_loads() {
    let pool = init_memory_database().await.unwrap();

    let summary = load(
        &pool,
        &[
            BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00"),
            BulkRow::bulk("G2", "S1", "2024-05-01 10:00:00")
                .set("TAXON CONCEPT ID", "avibase-2")
                .set("COMMON NAME", "American Robin"),
            BulkRow::bulk("G3", "S1", "2024-05-01 10:00:00")
                .set("TAXON CONCEPT ID", "avibase-3")
                .set("OBSERVATION COUNT", "X"),
        ],
    )
    .await;

    assert_eq!(summary.added, 3);
    assert_eq!(count_rows(&pool, Table::Checklist).await.unwrap(), 1);
    assert_eq!(count_rows(&pool, Table::Species).await.unwrap(), 3);

    let checklist = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    let observations = Observation::for_checklist(&pool, checklist.audit.id).await.unwrap();
    assert_eq!(observations.len(), 3);

    let uncounted = Observation::find_by_identifier(&pool, "G3").await.unwrap().unwrap();
    assert_eq!(uncounted.count, None);
}

#[tokio::test]
async fn test_bad_row_fails_alone() {
    let pool = init_memory_database().await.unwrap();

    let summary = load(
        &pool,
        &[
            BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00"),
            BulkRow::bulk("G2", "S2", "2024-05-01 10:00:00")
                .set("LOCALITY ID", "L2")
                .set("LATITUDE", "north"),
            BulkRow::bulk("G3", "S3", "2024-05-01 10:00:00"),
        ],
    )
    .await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.added, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.count_by_severity(IssueSeverity::Failed), 1);
    assert_eq!(summary.issues[0].unit, "row 3");

    // Nothing of the failed row survives its rollback
    assert!(Location::find_by_identifier(&pool, "L2").await.unwrap().is_none());
    assert!(Checklist::find_by_identifier(&pool, "S2").await.unwrap().is_none());
    assert!(Checklist::find_by_identifier(&pool, "S3").await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let pool = init_memory_database().await.unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.txt");

    let result = BasicDatasetLoader::new(pool, LoaderConfig::default())
        .load(&path)
        .await;

    assert!(matches!(result, Err(LoaderError::NotFound(p)) if p == path));
}

#[tokio::test]
async fn test_strict_keys_reject_empty_locality() {
    let pool = init_memory_database().await.unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_tsv(
        dir.path(),
        &[BulkRow::bulk("G1", "S1", "2024-05-01 10:00:00").set("LOCALITY ID", "")],
    );

    let strict = LoaderConfig::default().with_key_policy(KeyPolicy::Strict);
    let summary = BasicDatasetLoader::new(pool.clone(), strict)
        .load(&path)
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(count_rows(&pool, Table::Location).await.unwrap(), 0);

    let summary = BasicDatasetLoader::new(pool.clone(), LoaderConfig::default())
        .load(&path)
        .await
        .unwrap();
    assert_eq!(summary.added, 1);
    assert!(Location::find_by_identifier(&pool, "").await.unwrap().is_some());
}
