//! eBird Basic Dataset rows
//!
//! Column names follow the EBD header. Identifier and date columns are
//! required; every other column defaults to empty when the file lacks it.

use chrono::NaiveDateTime;
use ebird_common::values::{
    parse_date, parse_revision, parse_time, to_boolean, to_count, to_decimal, to_integer,
};
use serde::Deserialize;

use super::{taxon_order, text};
use crate::error::{LoaderError, LoaderResult};
use crate::reconcile::{
    ChecklistFields, LocationFields, NaturalKey, ObservationFields, ObserverFields, SpeciesFields,
};

/// `LOCALITY TYPE` of an eBird hotspot
const HOTSPOT: &str = "H";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicDatasetRow {
    #[serde(rename = "GLOBAL UNIQUE IDENTIFIER")]
    pub global_unique_identifier: String,
    #[serde(rename = "LAST EDITED DATE")]
    pub last_edited_date: String,
    #[serde(rename = "TAXONOMIC ORDER", default)]
    pub taxonomic_order: String,
    #[serde(rename = "CATEGORY", default)]
    pub category: String,
    #[serde(rename = "TAXON CONCEPT ID", default)]
    pub taxon_concept_id: String,
    #[serde(rename = "COMMON NAME", default)]
    pub common_name: String,
    #[serde(rename = "SCIENTIFIC NAME", default)]
    pub scientific_name: String,
    #[serde(rename = "SUBSPECIES COMMON NAME", default)]
    pub subspecies_common_name: String,
    #[serde(rename = "SUBSPECIES SCIENTIFIC NAME", default)]
    pub subspecies_scientific_name: String,
    #[serde(rename = "EXOTIC CODE", default)]
    pub exotic_code: String,
    #[serde(rename = "OBSERVATION COUNT", default)]
    pub observation_count: String,
    #[serde(rename = "BREEDING CODE", default)]
    pub breeding_code: String,
    #[serde(rename = "BREEDING CATEGORY", default)]
    pub breeding_category: String,
    #[serde(rename = "BEHAVIOR CODE", default)]
    pub behavior_code: String,
    #[serde(rename = "AGE/SEX", default)]
    pub age_sex: String,
    #[serde(rename = "COUNTRY", default)]
    pub country: String,
    #[serde(rename = "COUNTRY CODE", default)]
    pub country_code: String,
    #[serde(rename = "STATE", default)]
    pub state: String,
    #[serde(rename = "STATE CODE", default)]
    pub state_code: String,
    #[serde(rename = "COUNTY", default)]
    pub county: String,
    #[serde(rename = "COUNTY CODE", default)]
    pub county_code: String,
    #[serde(rename = "IBA CODE", default)]
    pub iba_code: String,
    #[serde(rename = "BCR CODE", default)]
    pub bcr_code: String,
    #[serde(rename = "USFWS CODE", default)]
    pub usfws_code: String,
    #[serde(rename = "ATLAS BLOCK", default)]
    pub atlas_block: String,
    #[serde(rename = "LOCALITY", default)]
    pub locality: String,
    #[serde(rename = "LOCALITY ID")]
    pub locality_id: String,
    #[serde(rename = "LOCALITY TYPE", default)]
    pub locality_type: String,
    #[serde(rename = "LATITUDE", default)]
    pub latitude: String,
    #[serde(rename = "LONGITUDE", default)]
    pub longitude: String,
    #[serde(rename = "OBSERVATION DATE")]
    pub observation_date: String,
    #[serde(rename = "TIME OBSERVATIONS STARTED", default)]
    pub time_observations_started: String,
    #[serde(rename = "OBSERVER ID")]
    pub observer_id: String,
    #[serde(rename = "SAMPLING EVENT IDENTIFIER")]
    pub sampling_event_identifier: String,
    #[serde(rename = "PROTOCOL TYPE", default)]
    pub protocol_type: String,
    #[serde(rename = "PROTOCOL CODE", default)]
    pub protocol_code: String,
    #[serde(rename = "PROJECT CODE", default)]
    pub project_code: String,
    #[serde(rename = "DURATION MINUTES", default)]
    pub duration_minutes: String,
    #[serde(rename = "EFFORT DISTANCE KM", default)]
    pub effort_distance_km: String,
    #[serde(rename = "EFFORT AREA HA", default)]
    pub effort_area_ha: String,
    #[serde(rename = "NUMBER OBSERVERS", default)]
    pub number_observers: String,
    #[serde(rename = "ALL SPECIES REPORTED", default)]
    pub all_species_reported: String,
    #[serde(rename = "GROUP IDENTIFIER", default)]
    pub group_identifier: String,
    #[serde(rename = "HAS MEDIA", default)]
    pub has_media: String,
    #[serde(rename = "APPROVED", default)]
    pub approved: String,
    #[serde(rename = "REVIEWED", default)]
    pub reviewed: String,
    #[serde(rename = "REASON", default)]
    pub reason: String,
    #[serde(rename = "TRIP COMMENTS", default)]
    pub trip_comments: String,
    #[serde(rename = "SPECIES COMMENTS", default)]
    pub species_comments: String,
}

/// The row's revision marker (`LAST EDITED DATE`), shared by every entity
/// it produces
pub fn revision(row: &BasicDatasetRow) -> LoaderResult<NaiveDateTime> {
    Ok(parse_revision(&row.last_edited_date)?)
}

pub fn location(row: &BasicDatasetRow) -> LoaderResult<(NaturalKey, LocationFields)> {
    let fields = LocationFields {
        location_type: text(&row.locality_type),
        name: text(&row.locality),
        county: text(&row.county),
        county_code: text(&row.county_code),
        state: text(&row.state),
        state_code: text(&row.state_code),
        country: text(&row.country),
        country_code: text(&row.country_code),
        latitude: Some(to_decimal(Some(&row.latitude))?),
        longitude: Some(to_decimal(Some(&row.longitude))?),
        iba_code: text(&row.iba_code),
        bcr_code: text(&row.bcr_code),
        usfws_code: text(&row.usfws_code),
        atlas_block: text(&row.atlas_block),
        hotspot: Some(Some(row.locality_type == HOTSPOT)),
        url: None,
    };

    Ok((NaturalKey::Identifier(row.locality_id.clone()), fields))
}

/// The dataset carries observer ids only, so the name is left alone
pub fn observer(row: &BasicDatasetRow) -> (NaturalKey, ObserverFields) {
    (
        NaturalKey::Identifier(row.observer_id.clone()),
        ObserverFields::default(),
    )
}

pub fn species(row: &BasicDatasetRow) -> LoaderResult<(NaturalKey, SpeciesFields)> {
    let fields = SpeciesFields {
        code: None,
        taxon_order: Some(taxon_order(Some(&row.taxonomic_order))?),
        category: text(&row.category),
        common_name: text(&row.common_name),
        scientific_name: text(&row.scientific_name),
        local_name: None,
        subspecies_common_name: text(&row.subspecies_common_name),
        subspecies_scientific_name: text(&row.subspecies_scientific_name),
        subspecies_local_name: None,
        exotic_code: text(&row.exotic_code),
    };

    Ok((NaturalKey::Identifier(row.taxon_concept_id.clone()), fields))
}

pub fn checklist(
    row: &BasicDatasetRow,
    location_id: i64,
    observer_id: i64,
) -> LoaderResult<(NaturalKey, ChecklistFields)> {
    let date = parse_date(Some(&row.observation_date))?
        .ok_or(LoaderError::MissingField("OBSERVATION DATE"))?;

    let fields = ChecklistFields {
        location_id: Some(location_id),
        observer_id: Some(observer_id),
        group_identifier: text(&row.group_identifier),
        observer_count: Some(to_integer(Some(&row.number_observers))?),
        species_count: None,
        date: Some(date),
        time: Some(parse_time(Some(&row.time_observations_started), "%H:%M:%S")?),
        protocol: text(&row.protocol_type),
        protocol_code: text(&row.protocol_code),
        project_code: text(&row.project_code),
        duration: Some(to_integer(Some(&row.duration_minutes))?),
        distance: Some(to_decimal(Some(&row.effort_distance_km))?),
        area: Some(to_decimal(Some(&row.effort_area_ha))?),
        complete: Some(to_boolean(Some(&row.all_species_reported))?),
        comments: text(&row.trip_comments),
        url: None,
    };

    Ok((
        NaturalKey::Identifier(row.sampling_event_identifier.clone()),
        fields,
    ))
}

pub fn observation(
    row: &BasicDatasetRow,
    checklist_id: i64,
    species_id: i64,
) -> LoaderResult<(NaturalKey, ObservationFields)> {
    let fields = ObservationFields {
        checklist_id: Some(checklist_id),
        species_id: Some(species_id),
        count: Some(to_count(Some(&row.observation_count))?),
        breeding_code: text(&row.breeding_code),
        breeding_category: text(&row.breeding_category),
        behavior_code: text(&row.behavior_code),
        age_sex: text(&row.age_sex),
        media: Some(to_boolean(Some(&row.has_media))?),
        approved: Some(to_boolean(Some(&row.approved))?),
        reviewed: Some(to_boolean(Some(&row.reviewed))?),
        reason: text(&row.reason),
        comments: text(&row.species_comments),
    };

    Ok((
        NaturalKey::Identifier(row.global_unique_identifier.clone()),
        fields,
    ))
}
