//! eBird API 2.0 checklist payloads
//!
//! The API does not carry breeding codes, review flags, group ids or trip
//! comments, so those fields are left unsupplied and whatever the Basic
//! Dataset stored for them survives an API refresh.

use chrono::NaiveDateTime;
use ebird_common::values::{parse_date, parse_revision, parse_time, to_count, to_decimal};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::text;
use crate::error::{LoaderError, LoaderResult};
use crate::reconcile::{
    ChecklistFields, LocationFields, NaturalKey, ObservationFields, ObserverFields,
};
use crate::services::ebird_client::ApiError;

/// `loc` object of a visit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    pub loc_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub latitude: Option<serde_json::Number>,
    #[serde(default)]
    pub longitude: Option<serde_json::Number>,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub subnational1_code: String,
    #[serde(default)]
    pub subnational1_name: String,
    #[serde(default)]
    pub subnational2_code: String,
    #[serde(default)]
    pub subnational2_name: String,
    #[serde(default)]
    pub is_hotspot: Option<bool>,
}

/// Checklist detail (`product/checklist/view`)
///
/// Observations stay raw so one malformed entry does not fail the checklist.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChecklist {
    pub sub_id: String,
    pub last_edited_dt: String,
    pub obs_dt: String,
    #[serde(default)]
    pub obs_time_valid: bool,
    #[serde(default)]
    pub user_display_name: String,
    #[serde(default)]
    pub num_observers: Option<i64>,
    #[serde(default)]
    pub num_species: Option<i64>,
    #[serde(default)]
    pub protocol_id: String,
    #[serde(default)]
    pub proj_id: String,
    #[serde(default)]
    pub duration_hrs: Option<serde_json::Number>,
    #[serde(default)]
    pub dist_km: Option<serde_json::Number>,
    #[serde(default)]
    pub area_ha: Option<serde_json::Number>,
    #[serde(default)]
    pub all_obs_reported: Option<bool>,
    #[serde(default)]
    pub obs: Vec<serde_json::Value>,
}

/// One species entry of a checklist
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiObservation {
    pub species_code: String,
    #[serde(default)]
    pub how_many_str: String,
    pub obs_id: String,
    pub proj_id: String,
}

fn from_raw<T: DeserializeOwned>(raw: &serde_json::Value) -> LoaderResult<T> {
    serde_json::from_value(raw.clone()).map_err(|e| LoaderError::Api(ApiError::Parse(e.to_string())))
}

fn number(value: &Option<serde_json::Number>) -> LoaderResult<Option<Decimal>> {
    let text = value.as_ref().map(|n| n.to_string());
    Ok(to_decimal(text.as_deref())?)
}

pub fn parse_checklist(raw: &serde_json::Value) -> LoaderResult<ApiChecklist> {
    from_raw(raw)
}

pub fn parse_observation(raw: &serde_json::Value) -> LoaderResult<ApiObservation> {
    from_raw(raw)
}

pub fn revision(checklist: &ApiChecklist) -> LoaderResult<NaiveDateTime> {
    Ok(parse_revision(&checklist.last_edited_dt)?)
}

pub fn location(raw: &serde_json::Value) -> LoaderResult<(NaturalKey, LocationFields)> {
    let loc: ApiLocation = from_raw(raw)?;

    let fields = LocationFields {
        location_type: None,
        name: text(&loc.name),
        county: text(&loc.subnational2_name),
        county_code: text(&loc.subnational2_code),
        state: text(&loc.subnational1_name),
        state_code: text(&loc.subnational1_code),
        country: text(&loc.country_name),
        country_code: text(&loc.country_code),
        latitude: Some(number(&loc.latitude)?),
        longitude: Some(number(&loc.longitude)?),
        iba_code: None,
        bcr_code: None,
        usfws_code: None,
        atlas_block: None,
        hotspot: loc.is_hotspot.map(Some),
        url: None,
    };

    Ok((NaturalKey::Identifier(loc.loc_id), fields))
}

/// Observers are matched by display name: the API exposes no stable id
pub fn observer(checklist: &ApiChecklist) -> (NaturalKey, ObserverFields) {
    let fields = ObserverFields {
        identifier: None,
        name: text(&checklist.user_display_name),
    };

    (NaturalKey::Name(checklist.user_display_name.clone()), fields)
}

pub fn checklist(
    checklist: &ApiChecklist,
    location_id: i64,
    observer_id: i64,
) -> LoaderResult<(NaturalKey, ChecklistFields)> {
    // obsDt is "YYYY-MM-DD HH:MM"; the time part is only meaningful when flagged
    let (date_part, time_part) = match checklist.obs_dt.split_once(' ') {
        Some((date, time)) => (date, Some(time)),
        None => (checklist.obs_dt.as_str(), None),
    };

    let date = parse_date(Some(date_part))?.ok_or(LoaderError::MissingField("obsDt"))?;
    let time = if checklist.obs_time_valid {
        parse_time(time_part, "%H:%M")?
    } else {
        None
    };

    let duration = number(&checklist.duration_hrs)?
        .and_then(|hours| (hours * Decimal::from(60)).round().to_i64());

    let fields = ChecklistFields {
        location_id: Some(location_id),
        observer_id: Some(observer_id),
        group_identifier: None,
        observer_count: Some(checklist.num_observers),
        species_count: Some(checklist.num_species),
        date: Some(date),
        time: Some(time),
        protocol: None,
        protocol_code: text(&checklist.protocol_id),
        project_code: text(&checklist.proj_id),
        duration: Some(duration),
        distance: Some(number(&checklist.dist_km)?),
        area: Some(number(&checklist.area_ha)?),
        complete: Some(Some(checklist.all_obs_reported.unwrap_or(false))),
        comments: None,
        url: None,
    };

    Ok((NaturalKey::Identifier(checklist.sub_id.clone()), fields))
}

/// Global identifier matching the Basic Dataset's `GLOBAL UNIQUE IDENTIFIER`
pub fn observation_identifier(observation: &ApiObservation) -> String {
    format!(
        "URN:CornellLabOfOrnithology:{}:{}",
        observation.proj_id, observation.obs_id
    )
}

pub fn observation(
    observation: &ApiObservation,
    checklist_id: i64,
    species_id: i64,
) -> LoaderResult<(NaturalKey, ObservationFields)> {
    let fields = ObservationFields {
        checklist_id: Some(checklist_id),
        species_id: Some(species_id),
        count: Some(to_count(Some(&observation.how_many_str))?),
        ..Default::default()
    };

    Ok((NaturalKey::Identifier(observation_identifier(observation)), fields))
}
