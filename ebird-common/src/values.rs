//! Raw value coercion
//!
//! Source records carry every value as text. Empty or absent text means
//! "unknown" and becomes `None`; it is never defaulted to zero or false.
//! Text that is present but cannot be cast is an [`Error::InvalidValue`].

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Formats accepted for source revision timestamps (`LAST EDITED DATE`,
/// `lastEditedDt`).
const REVISION_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Returns the trimmed text, or `None` when it is absent or blank.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

pub fn to_boolean(raw: Option<&str>) -> Result<Option<bool>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(Some(true)),
        "0" | "false" | "f" | "no" | "n" => Ok(Some(false)),
        _ => Err(Error::invalid_value("boolean", value, "expected 1/0, true/false or yes/no")),
    }
}

pub fn to_integer(raw: Option<&str>) -> Result<Option<i64>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    value
        .parse::<i64>()
        .map(Some)
        .map_err(|e| Error::invalid_value("integer", value, e))
}

/// Parse a fixed-point decimal, keeping the scale written in the source
/// (`"42.360100"` stays six places).
pub fn to_decimal(raw: Option<&str>) -> Result<Option<Decimal>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map(Some)
        .map_err(|e| Error::invalid_value("decimal", value, e))
}

/// Derive an observation count.
///
/// eBird writes `X` for "present but not counted". Anything that does not
/// start with a digit is unknown, and so is a zero count. A digit-leading
/// string that is still not an integer (`"12abc"`) is an error.
pub fn to_count(raw: Option<&str>) -> Result<Option<i64>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    if !value.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }

    Ok(to_integer(Some(value))?.filter(|count| *count != 0))
}

/// Parse an ISO date (`YYYY-MM-DD`).
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| Error::invalid_value("date", value, e))
}

/// Parse a time of day with the given `chrono` format.
pub fn parse_time(raw: Option<&str>, format: &str) -> Result<Option<NaiveTime>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    NaiveTime::parse_from_str(value, format)
        .map(Some)
        .map_err(|e| Error::invalid_value("time", value, e))
}

/// Parse a source revision timestamp.
///
/// Accepts ISO-8601 with either a `T` or a space separator, with or without
/// seconds and fractional seconds.
pub fn parse_revision(raw: &str) -> Result<NaiveDateTime> {
    let value = raw.trim();

    REVISION_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| Error::invalid_value("timestamp", value, "not an ISO-8601 date and time"))
}
