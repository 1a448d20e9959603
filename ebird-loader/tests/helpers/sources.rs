//! Source file fixtures
//!
//! Builders for Basic Dataset rows and personal export rows, written to
//! temporary files in the exact layout the loaders read.

use chrono::{NaiveDate, NaiveDateTime};
use ebird_loader::reconcile::{create, Revision, SpeciesFields};
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp on 2024-05-01 at `hour`:00
pub fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// One row of a tab or comma delimited file, columns in header order
#[derive(Debug, Clone)]
pub struct CsvRow(Vec<(&'static str, String)>);

impl CsvRow {
    fn new(columns: &[(&'static str, &str)]) -> Self {
        Self(
            columns
                .iter()
                .map(|(name, value)| (*name, value.to_string()))
                .collect(),
        )
    }

    /// Replace a column's value, appending the column if it is not present
    pub fn set(mut self, column: &'static str, value: &str) -> Self {
        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.0.push((column, value.to_string())),
        }
        self
    }

    fn header(&self) -> Vec<&'static str> {
        self.0.iter().map(|(name, _)| *name).collect()
    }

    fn values(&self) -> Vec<&str> {
        self.0.iter().map(|(_, value)| value.as_str()).collect()
    }
}

pub type BulkRow = CsvRow;

impl CsvRow {
    /// A Basic Dataset row for observation `guid` on checklist `checklist`
    pub fn bulk(guid: &str, checklist: &str, edited: &str) -> Self {
        Self::new(&[
            ("GLOBAL UNIQUE IDENTIFIER", guid),
            ("LAST EDITED DATE", edited),
            ("TAXONOMIC ORDER", "20213"),
            ("CATEGORY", "species"),
            ("TAXON CONCEPT ID", "avibase-1"),
            ("COMMON NAME", "Blue Jay"),
            ("SCIENTIFIC NAME", "Cyanocitta cristata"),
            ("OBSERVATION COUNT", "2"),
            ("COUNTRY", "United States"),
            ("COUNTRY CODE", "US"),
            ("STATE", "Massachusetts"),
            ("STATE CODE", "US-MA"),
            ("COUNTY", "Suffolk"),
            ("COUNTY CODE", "US-MA-025"),
            ("LOCALITY", "Back Bay Fens"),
            ("LOCALITY ID", "L1"),
            ("LOCALITY TYPE", "H"),
            ("LATITUDE", "42.3434100"),
            ("LONGITUDE", "-71.0945"),
            ("OBSERVATION DATE", "2024-05-01"),
            ("TIME OBSERVATIONS STARTED", "07:30:00"),
            ("OBSERVER ID", "obsr1"),
            ("SAMPLING EVENT IDENTIFIER", checklist),
            ("PROTOCOL TYPE", "Traveling"),
            ("PROTOCOL CODE", "P22"),
            ("DURATION MINUTES", "60"),
            ("EFFORT DISTANCE KM", "1.5"),
            ("NUMBER OBSERVERS", "1"),
            ("ALL SPECIES REPORTED", "1"),
        ])
    }
}

/// A personal export row for submission `checklist`
pub fn personal_row(checklist: &str, taxonomic_order: &str, count: &str) -> CsvRow {
    CsvRow::new(&[
        ("Submission ID", checklist),
        ("Common Name", "Blue Jay"),
        ("Scientific Name", "Cyanocitta cristata"),
        ("Taxonomic Order", taxonomic_order),
        ("Count", count),
        ("State/Province", "US-MA"),
        ("County", "Suffolk"),
        ("Location ID", "L9"),
        ("Location", "Back Bay Fens"),
        ("Latitude", "42.34341"),
        ("Longitude", "-71.0945"),
        ("Date", "2024-05-01"),
        ("Time", "07:30 AM"),
        ("Protocol", "eBird - Traveling Count"),
        ("Duration (Min)", "45"),
        ("All Obs Reported", "1"),
        ("Distance Traveled (km)", "1.2"),
        ("Area Covered (ha)", ""),
        ("Number of Observers", "1"),
        ("Breeding Code", ""),
        ("Observation Details", ""),
        ("Checklist Comments", ""),
        ("ML Catalog Numbers", ""),
    ])
}

fn write_delimited(path: &Path, rows: &[CsvRow], delimiter: &str) -> PathBuf {
    let mut content = String::new();

    if let Some(first) = rows.first() {
        content.push_str(&first.header().join(delimiter));
        content.push('\n');
    }
    for row in rows {
        content.push_str(&row.values().join(delimiter));
        content.push('\n');
    }

    fs::write(path, content).unwrap();
    path.to_path_buf()
}

/// Write a Basic Dataset extract (tab delimited, unquoted)
pub fn write_tsv(dir: &Path, rows: &[CsvRow]) -> PathBuf {
    write_delimited(&dir.join("ebd.txt"), rows, "\t")
}

/// Write a personal export (comma delimited)
pub fn write_csv(dir: &Path, rows: &[CsvRow]) -> PathBuf {
    write_delimited(&dir.join("MyEBirdData.csv"), rows, ",")
}

/// Insert a species the API loader can resolve by code
pub async fn seed_species(pool: &SqlitePool, code: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    let fields = SpeciesFields {
        code: Some(code.to_string()),
        common_name: Some(code.to_string()),
        ..Default::default()
    };

    create(&mut conn, None, Revision::Untracked, &fields)
        .await
        .unwrap()
}
