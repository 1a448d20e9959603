//! Typed field sets, one per entity
//!
//! Every field is an `Option`: `None` means "not supplied by this source"
//! and leaves the stored column alone on update (or at its schema default
//! on insert). Nullable columns nest a second `Option` for the value itself,
//! so `Some(None)` writes NULL.

use chrono::{NaiveDate, NaiveTime};
use ebird_common::db::Table;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite};

/// A column value ready to bind
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(Option<i64>),
    /// Bound as TEXT to keep the source scale
    Decimal(Option<Decimal>),
    Boolean(Option<bool>),
    Date(NaiveDate),
    Time(Option<NaiveTime>),
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(Some(value))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Option<Decimal>> for SqlValue {
    fn from(value: Option<Decimal>) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(value: Option<bool>) -> Self {
        SqlValue::Boolean(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<Option<NaiveTime>> for SqlValue {
    fn from(value: Option<NaiveTime>) -> Self {
        SqlValue::Time(value)
    }
}

impl SqlValue {
    pub(crate) fn push_bind(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            SqlValue::Text(value) => builder.push_bind(value),
            SqlValue::Integer(value) => builder.push_bind(value),
            SqlValue::Decimal(value) => builder.push_bind(value.map(|d| d.to_string())),
            SqlValue::Boolean(value) => builder.push_bind(value),
            SqlValue::Date(value) => builder.push_bind(value),
            SqlValue::Time(value) => builder.push_bind(value),
        };
    }
}

/// A field set that can be written to its table
pub trait Entity {
    const TABLE: Table;

    /// Supplied columns and their values, in column order
    fn assignments(&self) -> Vec<(&'static str, SqlValue)>;
}

#[derive(Default)]
struct Assignments(Vec<(&'static str, SqlValue)>);

impl Assignments {
    fn set<T: Clone + Into<SqlValue>>(&mut self, column: &'static str, value: &Option<T>) {
        if let Some(value) = value {
            self.0.push((column, value.clone().into()));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesFields {
    pub code: Option<String>,
    pub taxon_order: Option<Option<i64>>,
    pub category: Option<String>,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub local_name: Option<String>,
    pub subspecies_common_name: Option<String>,
    pub subspecies_scientific_name: Option<String>,
    pub subspecies_local_name: Option<String>,
    pub exotic_code: Option<String>,
}

impl Entity for SpeciesFields {
    const TABLE: Table = Table::Species;

    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Assignments::default();
        out.set("code", &self.code);
        out.set("taxon_order", &self.taxon_order);
        out.set("category", &self.category);
        out.set("common_name", &self.common_name);
        out.set("scientific_name", &self.scientific_name);
        out.set("local_name", &self.local_name);
        out.set("subspecies_common_name", &self.subspecies_common_name);
        out.set("subspecies_scientific_name", &self.subspecies_scientific_name);
        out.set("subspecies_local_name", &self.subspecies_local_name);
        out.set("exotic_code", &self.exotic_code);
        out.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFields {
    pub location_type: Option<String>,
    pub name: Option<String>,
    pub county: Option<String>,
    pub county_code: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<Option<Decimal>>,
    pub longitude: Option<Option<Decimal>>,
    pub iba_code: Option<String>,
    pub bcr_code: Option<String>,
    pub usfws_code: Option<String>,
    pub atlas_block: Option<String>,
    pub hotspot: Option<Option<bool>>,
    pub url: Option<String>,
}

impl Entity for LocationFields {
    const TABLE: Table = Table::Location;

    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Assignments::default();
        out.set("type", &self.location_type);
        out.set("name", &self.name);
        out.set("county", &self.county);
        out.set("county_code", &self.county_code);
        out.set("state", &self.state);
        out.set("state_code", &self.state_code);
        out.set("country", &self.country);
        out.set("country_code", &self.country_code);
        out.set("latitude", &self.latitude);
        out.set("longitude", &self.longitude);
        out.set("iba_code", &self.iba_code);
        out.set("bcr_code", &self.bcr_code);
        out.set("usfws_code", &self.usfws_code);
        out.set("atlas_block", &self.atlas_block);
        out.set("hotspot", &self.hotspot);
        out.set("url", &self.url);
        out.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObserverFields {
    pub identifier: Option<String>,
    pub name: Option<String>,
}

impl Entity for ObserverFields {
    const TABLE: Table = Table::Observer;

    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Assignments::default();
        out.set("identifier", &self.identifier);
        out.set("name", &self.name);
        out.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistFields {
    pub location_id: Option<i64>,
    pub observer_id: Option<i64>,
    pub group_identifier: Option<String>,
    pub observer_count: Option<Option<i64>>,
    pub species_count: Option<Option<i64>>,
    pub date: Option<NaiveDate>,
    pub time: Option<Option<NaiveTime>>,
    pub protocol: Option<String>,
    pub protocol_code: Option<String>,
    pub project_code: Option<String>,
    pub duration: Option<Option<i64>>,
    pub distance: Option<Option<Decimal>>,
    pub area: Option<Option<Decimal>>,
    pub complete: Option<Option<bool>>,
    pub comments: Option<String>,
    pub url: Option<String>,
}

impl Entity for ChecklistFields {
    const TABLE: Table = Table::Checklist;

    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Assignments::default();
        out.set("location_id", &self.location_id);
        out.set("observer_id", &self.observer_id);
        out.set("group_identifier", &self.group_identifier);
        out.set("observer_count", &self.observer_count);
        out.set("species_count", &self.species_count);
        out.set("date", &self.date);
        out.set("time", &self.time);
        out.set("protocol", &self.protocol);
        out.set("protocol_code", &self.protocol_code);
        out.set("project_code", &self.project_code);
        out.set("duration", &self.duration);
        out.set("distance", &self.distance);
        out.set("area", &self.area);
        out.set("complete", &self.complete);
        out.set("comments", &self.comments);
        out.set("url", &self.url);
        out.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFields {
    pub checklist_id: Option<i64>,
    pub species_id: Option<i64>,
    pub count: Option<Option<i64>>,
    pub breeding_code: Option<String>,
    pub breeding_category: Option<String>,
    pub behavior_code: Option<String>,
    pub age_sex: Option<String>,
    pub media: Option<Option<bool>>,
    pub approved: Option<Option<bool>>,
    pub reviewed: Option<Option<bool>>,
    pub reason: Option<String>,
    pub comments: Option<String>,
}

impl Entity for ObservationFields {
    const TABLE: Table = Table::Observation;

    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Assignments::default();
        out.set("checklist_id", &self.checklist_id);
        out.set("species_id", &self.species_id);
        out.set("count", &self.count);
        out.set("breeding_code", &self.breeding_code);
        out.set("breeding_category", &self.breeding_category);
        out.set("behavior_code", &self.behavior_code);
        out.set("age_sex", &self.age_sex);
        out.set("media", &self.media);
        out.set("approved", &self.approved);
        out.set("reviewed", &self.reviewed);
        out.set("reason", &self.reason);
        out.set("comments", &self.comments);
        out.0
    }
}
