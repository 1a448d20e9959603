//! API loader tests against a scripted eBird API

mod helpers;

use chrono::NaiveDate;
use ebird_common::db::init_memory_database;
use ebird_common::db::models::{count_rows, Checklist, Location, Observation, Observer, Table};
use ebird_loader::config::LoaderConfig;
use ebird_loader::loaders::ApiLoader;
use ebird_loader::models::{IssueSeverity, LoadSummary};
use helpers::{at, checklist_json, location_json, seed_species, MockApi};
use sqlx::SqlitePool;

const REGION: &str = "US-MA";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

async fn load(pool: &SqlitePool, api: MockApi) -> LoadSummary {
    ApiLoader::new(api, pool.clone(), LoaderConfig::default())
        .load_region(REGION, day())
        .await
        .unwrap()
}

async fn setup() -> SqlitePool {
    let pool = init_memory_database().await.unwrap();
    seed_species(&pool, "amerob").await;
    seed_species(&pool, "blujay").await;
    pool
}

#[tokio::test]
async fn test_new_checklist_is_added() {
    let pool = setup().await;
    let api = MockApi::new().checklist(
        location_json("L1", "Pond"),
        checklist_json("S1", at(10), &[("amerob", "OBS1", "2"), ("blujay", "OBS2", "X")]),
    );

    let summary = load(&pool, api).await;
    assert_eq!(summary.added, 1);
    assert_eq!(summary.deleted, 0);

    let checklist = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    assert_eq!(checklist.audit.edited, Some(at(10)));
    assert_eq!(checklist.duration, Some(90));
    assert_eq!(checklist.species_count, Some(2));

    let observer = Observer::find_by_name(&pool, "A Birder").await.unwrap().unwrap();
    assert_eq!(checklist.observer_id, observer.audit.id);

    let location = Location::find_by_identifier(&pool, "L1").await.unwrap().unwrap();
    assert_eq!(location.hotspot, Some(false));

    let robin = Observation::find_by_identifier(&pool, "URN:CornellLabOfOrnithology:EBIRD:OBS1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(robin.count, Some(2));
    assert_eq!(robin.audit.edited, Some(at(10)));

    let jay = Observation::find_by_identifier(&pool, "URN:CornellLabOfOrnithology:EBIRD:OBS2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jay.count, None);
}

#[tokio::test]
async fn test_refetch_deletes_withdrawn_observation() {
    let pool = setup().await;

    load(
        &pool,
        MockApi::new().checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(10), &[("amerob", "OBS1", "2"), ("blujay", "OBS2", "1")]),
        ),
    )
    .await;

    let summary = load(
        &pool,
        MockApi::new().checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(11), &[("amerob", "OBS1", "4")]),
        ),
    )
    .await;

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, 1);

    let checklist = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    let observations = Observation::for_checklist(&pool, checklist.audit.id).await.unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].identifier, "URN:CornellLabOfOrnithology:EBIRD:OBS1");
    assert_eq!(observations[0].count, Some(4));
    assert_eq!(observations[0].audit.edited, Some(at(11)));
    assert_eq!(checklist.audit.edited, Some(at(11)));
}

#[tokio::test]
async fn test_same_revision_is_unchanged() {
    let pool = setup().await;
    let payload = checklist_json("S1", at(10), &[("amerob", "OBS1", "2")]);

    load(&pool, MockApi::new().checklist(location_json("L1", "Pond"), payload.clone())).await;
    let before = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();

    let summary = load(&pool, MockApi::new().checklist(location_json("L1", "Pond"), payload)).await;
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.deleted, 0);

    let after = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    assert_eq!(before.audit.modified, after.audit.modified);
    assert_eq!(count_rows(&pool, Table::Observation).await.unwrap(), 1);
}

#[tokio::test]
async fn test_bad_observation_skipped_others_load() {
    let pool = setup().await;
    let api = MockApi::new()
        .checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(10), &[("amerob", "OBS1", "1")]),
        )
        .checklist(
            location_json("L1", "Pond"),
            checklist_json("S2", at(10), &[("nosuch", "OBS2", "1"), ("blujay", "OBS3", "1")]),
        )
        .checklist(
            location_json("L1", "Pond"),
            checklist_json("S3", at(10), &[("blujay", "OBS4", "1")]),
        );

    let summary = load(&pool, api).await;
    assert_eq!(summary.added, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.count_by_severity(IssueSeverity::Warning), 1);

    let second = Checklist::find_by_identifier(&pool, "S2").await.unwrap().unwrap();
    let observations = Observation::for_checklist(&pool, second.audit.id).await.unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].identifier, "URN:CornellLabOfOrnithology:EBIRD:OBS3");
    assert_eq!(count_rows(&pool, Table::Observation).await.unwrap(), 3);
}

#[tokio::test]
async fn test_bad_checklist_rolled_back_others_commit() {
    let pool = setup().await;

    let mut broken = checklist_json("S2", at(10), &[("amerob", "OBS2", "1")]);
    broken["obsDt"] = serde_json::json!("yesterday");

    let api = MockApi::new()
        .checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(10), &[("amerob", "OBS1", "1")]),
        )
        .checklist(location_json("L2", "Marsh"), broken)
        .checklist(
            location_json("L3", "Field"),
            checklist_json("S3", at(10), &[("blujay", "OBS3", "1")]),
        );

    let summary = load(&pool, api).await;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.added, 2);
    assert_eq!(summary.failed, 1);

    // The location reconciled before the failure went with the savepoint
    assert!(Location::find_by_identifier(&pool, "L2").await.unwrap().is_none());
    assert!(Checklist::find_by_identifier(&pool, "S2").await.unwrap().is_none());

    for id in ["S1", "S3"] {
        let checklist = Checklist::find_by_identifier(&pool, id).await.unwrap().unwrap();
        let observations = Observation::for_checklist(&pool, checklist.audit.id).await.unwrap();
        assert_eq!(observations.len(), 1, "{} observations", id);
    }
}

#[tokio::test]
async fn test_rolled_back_checklist_leaves_no_warnings_or_deletions() {
    let pool = setup().await;

    load(
        &pool,
        MockApi::new().checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(10), &[("amerob", "OBS1", "2"), ("blujay", "OBS2", "1")]),
        ),
    )
    .await;

    // Fails the orphan sweep after the unknown species has been warned about
    sqlx::query(
        "CREATE TRIGGER keep_observations BEFORE DELETE ON observation \
         BEGIN SELECT RAISE(ABORT, 'observations are locked'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let summary = load(
        &pool,
        MockApi::new().checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(11), &[("amerob", "OBS1", "4"), ("nosuch", "OBS3", "1")]),
        ),
    )
    .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.count_by_severity(IssueSeverity::Warning), 0);
    assert_eq!(summary.count_by_severity(IssueSeverity::Failed), 1);

    let checklist = Checklist::find_by_identifier(&pool, "S1").await.unwrap().unwrap();
    assert_eq!(checklist.audit.edited, Some(at(10)));
    assert_eq!(count_rows(&pool, Table::Observation).await.unwrap(), 2);
}

#[tokio::test]
async fn test_visit_fetch_failure_skips_unit() {
    let pool = setup().await;

    let summary = load(&pool, MockApi::new().visits_fail()).await;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.issues[0].unit, "US-MA 2024-05-01");
    assert_eq!(summary.issues[0].severity, IssueSeverity::Skip);
    assert_eq!(count_rows(&pool, Table::Checklist).await.unwrap(), 0);
}

#[tokio::test]
async fn test_checklist_fetch_failure_skips_checklist() {
    let pool = setup().await;
    let api = MockApi::new()
        .unfetchable("S9")
        .checklist(
            location_json("L1", "Pond"),
            checklist_json("S1", at(10), &[("amerob", "OBS1", "1")]),
        );

    let summary = load(&pool, api).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.added, 1);
    assert!(Checklist::find_by_identifier(&pool, "S1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_load_merges_regions_and_dates() {
    let pool = setup().await;
    let api = MockApi::new().checklist(
        location_json("L1", "Pond"),
        checklist_json("S1", at(10), &[("amerob", "OBS1", "1")]),
    );

    let regions = vec!["US-MA".to_string(), "US-NH".to_string()];
    let summary = ApiLoader::new(api, pool.clone(), LoaderConfig::default())
        .load(&regions, &[day()])
        .await
        .unwrap();

    // The scripted API lists the same visit for both regions
    assert_eq!(summary.total, 2);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.unchanged, 1);
}
