//! Personal "Download My Data" export rows
//!
//! The export belongs to one observer, who is supplied by the caller. It has
//! no revision markers and no observation identifiers.

use ebird_common::values::{parse_date, parse_time, to_count, to_decimal, to_integer};
use serde::Deserialize;

use super::{taxon_order, text};
use crate::error::{LoaderError, LoaderResult};
use crate::reconcile::{
    ChecklistFields, LocationFields, NaturalKey, ObservationFields, ObserverFields, SpeciesFields,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalRow {
    #[serde(rename = "Submission ID")]
    pub submission_id: String,
    #[serde(rename = "Common Name", default)]
    pub common_name: String,
    #[serde(rename = "Scientific Name", default)]
    pub scientific_name: String,
    #[serde(rename = "Taxonomic Order", default)]
    pub taxonomic_order: String,
    #[serde(rename = "Count", default)]
    pub count: String,
    #[serde(rename = "State/Province", default)]
    pub state_province: String,
    #[serde(rename = "County", default)]
    pub county: String,
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "Latitude", default)]
    pub latitude: String,
    #[serde(rename = "Longitude", default)]
    pub longitude: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "Protocol", default)]
    pub protocol: String,
    #[serde(rename = "Duration (Min)", default)]
    pub duration: String,
    #[serde(rename = "All Obs Reported", default)]
    pub all_obs_reported: String,
    #[serde(rename = "Distance Traveled (km)", default)]
    pub distance: String,
    #[serde(rename = "Area Covered (ha)", default)]
    pub area: String,
    #[serde(rename = "Number of Observers", default)]
    pub number_of_observers: String,
    #[serde(rename = "Breeding Code", default)]
    pub breeding_code: String,
    #[serde(rename = "Observation Details", default)]
    pub observation_details: String,
    #[serde(rename = "Checklist Comments", default)]
    pub checklist_comments: String,
    #[serde(rename = "ML Catalog Numbers", default)]
    pub ml_catalog_numbers: String,
}

pub fn observer(name: &str) -> (NaturalKey, ObserverFields) {
    let fields = ObserverFields {
        identifier: None,
        name: text(name),
    };

    (NaturalKey::Name(name.to_string()), fields)
}

pub fn location(row: &PersonalRow) -> LoaderResult<(NaturalKey, LocationFields)> {
    // State/Province is a region code such as "US-MA"
    let country_code = row
        .state_province
        .split('-')
        .next()
        .unwrap_or_default();

    let fields = LocationFields {
        name: text(&row.location),
        county: text(&row.county),
        state: text(&row.state_province),
        country_code: text(country_code),
        latitude: Some(to_decimal(Some(&row.latitude))?),
        longitude: Some(to_decimal(Some(&row.longitude))?),
        ..Default::default()
    };

    Ok((NaturalKey::Identifier(row.location_id.clone()), fields))
}

/// Species are matched by taxonomic order, the only stable taxon key in the export.
/// A blank order is the empty key and is subject to the key policy.
pub fn species(row: &PersonalRow) -> LoaderResult<(NaturalKey, SpeciesFields)> {
    let order = taxon_order(Some(&row.taxonomic_order))?;

    let fields = SpeciesFields {
        common_name: text(&row.common_name),
        scientific_name: text(&row.scientific_name),
        ..Default::default()
    };

    Ok((NaturalKey::TaxonOrder(order), fields))
}

pub fn checklist(
    row: &PersonalRow,
    location_id: i64,
    observer_id: i64,
) -> LoaderResult<(NaturalKey, ChecklistFields)> {
    let date = parse_date(Some(&row.date))?.ok_or(LoaderError::MissingField("Date"))?;

    let fields = ChecklistFields {
        location_id: Some(location_id),
        observer_id: Some(observer_id),
        observer_count: Some(to_integer(Some(&row.number_of_observers))?),
        date: Some(date),
        time: Some(parse_time(Some(&row.time), "%I:%M %p")?),
        protocol: text(&row.protocol),
        duration: Some(to_integer(Some(&row.duration))?),
        distance: Some(to_decimal(Some(&row.distance))?),
        area: Some(to_decimal(Some(&row.area))?),
        complete: Some(Some(row.all_obs_reported.trim() == "1")),
        comments: text(&row.checklist_comments),
        ..Default::default()
    };

    Ok((NaturalKey::Identifier(row.submission_id.clone()), fields))
}

/// Observation fields; the export has no identifier so these are always inserted
pub fn observation(
    row: &PersonalRow,
    checklist_id: i64,
    species_id: i64,
) -> LoaderResult<ObservationFields> {
    Ok(ObservationFields {
        checklist_id: Some(checklist_id),
        species_id: Some(species_id),
        count: Some(to_count(Some(&row.count))?),
        breeding_code: text(&row.breeding_code),
        media: Some(Some(!row.ml_catalog_numbers.trim().is_empty())),
        comments: text(&row.observation_details),
        ..Default::default()
    })
}
