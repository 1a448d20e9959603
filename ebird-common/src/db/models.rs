//! Database models
//!
//! Row types for the five checklist tables, with the read queries used by
//! the loaders and their tests. Writes go through the loader's reconciler.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;

/// The checklist tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Species,
    Location,
    Observer,
    Checklist,
    Observation,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Species,
        Table::Location,
        Table::Observer,
        Table::Checklist,
        Table::Observation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Species => "species",
            Table::Location => "location",
            Table::Observer => "observer",
            Table::Checklist => "checklist",
            Table::Observation => "observation",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping columns shared by every table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub id: i64,
    /// First time the row was written locally
    pub created: DateTime<Utc>,
    /// Last time the row was written locally
    pub modified: DateTime<Utc>,
    /// Source's own last-modified time (revision marker)
    pub edited: Option<NaiveDateTime>,
}

impl Audit {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            created: row.try_get("created")?,
            modified: row.try_get("modified")?,
            edited: row.try_get("edited")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub audit: Audit,
    pub identifier: String,
    pub code: String,
    pub taxon_order: Option<i64>,
    pub category: String,
    pub common_name: String,
    pub scientific_name: String,
    pub local_name: String,
    pub subspecies_common_name: String,
    pub subspecies_scientific_name: String,
    pub subspecies_local_name: String,
    pub exotic_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub audit: Audit,
    pub identifier: String,
    pub location_type: String,
    pub name: String,
    pub county: String,
    pub county_code: String,
    pub state: String,
    pub state_code: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub iba_code: String,
    pub bcr_code: String,
    pub usfws_code: String,
    pub atlas_block: String,
    pub hotspot: Option<bool>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub audit: Audit,
    pub identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub audit: Audit,
    pub identifier: String,
    pub location_id: i64,
    pub observer_id: i64,
    pub group_identifier: String,
    pub observer_count: Option<i64>,
    pub species_count: Option<i64>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub protocol: String,
    pub protocol_code: String,
    pub project_code: String,
    /// Minutes
    pub duration: Option<i64>,
    /// Kilometres
    pub distance: Option<Decimal>,
    /// Hectares
    pub area: Option<Decimal>,
    pub complete: Option<bool>,
    pub comments: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub audit: Audit,
    pub identifier: String,
    pub checklist_id: i64,
    pub species_id: i64,
    /// `None` when absent, zero, or not counted (`X`)
    pub count: Option<i64>,
    pub breeding_code: String,
    pub breeding_category: String,
    pub behavior_code: String,
    pub age_sex: String,
    pub media: Option<bool>,
    pub approved: Option<bool>,
    pub reviewed: Option<bool>,
    pub reason: String,
    pub comments: String,
}

/// Decimals are stored as TEXT in their source form
fn decimal_column(row: &SqliteRow, column: &'static str) -> Result<Option<Decimal>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|value| {
        Decimal::from_str(&value).map_err(|e| Error::invalid_value("decimal", &value, e))
    })
    .transpose()
}

impl Species {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            audit: Audit::from_row(row)?,
            identifier: row.try_get("identifier")?,
            code: row.try_get("code")?,
            taxon_order: row.try_get("taxon_order")?,
            category: row.try_get("category")?,
            common_name: row.try_get("common_name")?,
            scientific_name: row.try_get("scientific_name")?,
            local_name: row.try_get("local_name")?,
            subspecies_common_name: row.try_get("subspecies_common_name")?,
            subspecies_scientific_name: row.try_get("subspecies_scientific_name")?,
            subspecies_local_name: row.try_get("subspecies_local_name")?,
            exotic_code: row.try_get("exotic_code")?,
        })
    }

    /// Load species by taxon concept identifier
    pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM species WHERE identifier = ? ORDER BY id LIMIT 1")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// Load species by eBird species code
    pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM species WHERE code = ? ORDER BY id LIMIT 1")
            .bind(code)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    pub async fn find_by_taxon_order(pool: &SqlitePool, taxon_order: i64) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM species WHERE taxon_order = ? ORDER BY id LIMIT 1")
            .bind(taxon_order)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }
}

impl Location {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            audit: Audit::from_row(row)?,
            identifier: row.try_get("identifier")?,
            location_type: row.try_get("type")?,
            name: row.try_get("name")?,
            county: row.try_get("county")?,
            county_code: row.try_get("county_code")?,
            state: row.try_get("state")?,
            state_code: row.try_get("state_code")?,
            country: row.try_get("country")?,
            country_code: row.try_get("country_code")?,
            latitude: decimal_column(row, "latitude")?,
            longitude: decimal_column(row, "longitude")?,
            iba_code: row.try_get("iba_code")?,
            bcr_code: row.try_get("bcr_code")?,
            usfws_code: row.try_get("usfws_code")?,
            atlas_block: row.try_get("atlas_block")?,
            hotspot: row.try_get("hotspot")?,
            url: row.try_get("url")?,
        })
    }

    pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM location WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }
}

impl Observer {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            audit: Audit::from_row(row)?,
            identifier: row.try_get("identifier")?,
            name: row.try_get("name")?,
        })
    }

    pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM observer WHERE identifier = ? ORDER BY id LIMIT 1")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM observer WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }
}

impl Checklist {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            audit: Audit::from_row(row)?,
            identifier: row.try_get("identifier")?,
            location_id: row.try_get("location_id")?,
            observer_id: row.try_get("observer_id")?,
            group_identifier: row.try_get("group_identifier")?,
            observer_count: row.try_get("observer_count")?,
            species_count: row.try_get("species_count")?,
            date: row.try_get("date")?,
            time: row.try_get("time")?,
            protocol: row.try_get("protocol")?,
            protocol_code: row.try_get("protocol_code")?,
            project_code: row.try_get("project_code")?,
            duration: row.try_get("duration")?,
            distance: decimal_column(row, "distance")?,
            area: decimal_column(row, "area")?,
            complete: row.try_get("complete")?,
            comments: row.try_get("comments")?,
            url: row.try_get("url")?,
        })
    }

    pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM checklist WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }
}

impl Observation {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            audit: Audit::from_row(row)?,
            identifier: row.try_get("identifier")?,
            checklist_id: row.try_get("checklist_id")?,
            species_id: row.try_get("species_id")?,
            count: row.try_get("count")?,
            breeding_code: row.try_get("breeding_code")?,
            breeding_category: row.try_get("breeding_category")?,
            behavior_code: row.try_get("behavior_code")?,
            age_sex: row.try_get("age_sex")?,
            media: row.try_get("media")?,
            approved: row.try_get("approved")?,
            reviewed: row.try_get("reviewed")?,
            reason: row.try_get("reason")?,
            comments: row.try_get("comments")?,
        })
    }

    pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<Self>> {
        sqlx::query("SELECT * FROM observation WHERE identifier = ? ORDER BY id LIMIT 1")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    /// All observations of a checklist, in insertion order
    pub async fn for_checklist(pool: &SqlitePool, checklist_id: i64) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT * FROM observation WHERE checklist_id = ? ORDER BY id")
            .bind(checklist_id)
            .fetch_all(pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }
}

/// Number of rows in a table
pub async fn count_rows(pool: &SqlitePool, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}
