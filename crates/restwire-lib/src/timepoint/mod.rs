//! ISO-8601 time points.
//!
//! Output is always rendered in UTC using [`TIME_POINT_OUTPUT_FORMAT`] unless a
//! mapper is configured with another format. Input is accepted in several
//! ISO-8601 shapes, see [`parse`].
//!
//! Date fields opt in with `#[serde(with = "restwire_lib::timepoint")]`
//! (or `timepoint::option` for `Option<DateTime<Utc>>`, together with
//! `#[serde(default)]`), or by using the [`Timepoint`] newtype directly.

use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Fixed output format for time points: `2024-03-01T12:30:00.000Z`.
pub const TIME_POINT_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Newtype name used to route time points through a mapper's type adapter.
pub const TYPE_NAME: &str = "$restwire::Timepoint";

// Tried in order after RFC 3339. Zoned shapes keep their offset, naive
// shapes are taken as UTC.
const ZONED_INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const NAIVE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimepointError {
    #[error("invalid date format pattern: {0:?}")]
    InvalidFormat(String),

    #[error("unparseable time point: {0:?}")]
    Unparseable(String),
}

/// Render a time point in the fixed output format.
pub fn format(value: &DateTime<Utc>) -> String {
    value.format(TIME_POINT_OUTPUT_FORMAT).to_string()
}

/// Render a time point with a caller-supplied `strftime` pattern.
///
/// Fails on an invalid pattern instead of panicking.
pub fn format_with(value: &DateTime<Utc>, pattern: &str) -> Result<String, TimepointError> {
    let items = compile(pattern)?;
    let mut out = String::new();
    write!(out, "{}", value.format_with_items(items.iter()))
        .map_err(|_| TimepointError::InvalidFormat(pattern.to_string()))?;
    Ok(out)
}

/// Check that a `strftime` pattern can be used for output.
pub fn validate_format(pattern: &str) -> Result<(), TimepointError> {
    compile(pattern).map(|_| ())
}

fn compile(pattern: &str) -> Result<Vec<Item<'_>>, TimepointError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if pattern.is_empty() || items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TimepointError::InvalidFormat(pattern.to_string()));
    }
    Ok(items)
}

/// Parse an ISO-8601 time point.
///
/// Accepted shapes: RFC 3339 (`Z` or offset, optional fraction), the same
/// without seconds, any of those without a zone (taken as UTC), and a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse(input: &str) -> Result<DateTime<Utc>, TimepointError> {
    let text = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = text.strip_suffix(['Z', 'z']) {
        if let Some(dt) = parse_naive(naive) {
            return Ok(dt);
        }
    }

    for pattern in ZONED_INPUT_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    if let Some(dt) = parse_naive(text) {
        return Ok(dt);
    }

    NaiveDate::parse_from_str(text, DATE_INPUT_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimepointError::Unparseable(input.to_string()))
}

/// Parse a time point written with `pattern`, falling back to [`parse`].
///
/// The pattern is tried as a zoned date-time, then as a date-time taken as
/// UTC, then as a bare date at midnight UTC.
pub fn parse_with(input: &str, pattern: &str) -> Result<DateTime<Utc>, TimepointError> {
    let text = input.trim();

    if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
        return Ok(naive.and_utc());
    }
    if let Some(dt) = NaiveDate::parse_from_str(text, pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc());
    }

    parse(input)
}

fn parse_naive(text: &str) -> Option<DateTime<Utc>> {
    NAIVE_INPUT_FORMATS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .map(|naive| naive.and_utc())
}

/// A UTC time point serialized as ISO-8601 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timepoint(pub DateTime<Utc>);

impl Timepoint {
    pub fn now() -> Self {
        Timepoint(Utc::now())
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timepoint {
    fn from(value: DateTime<Utc>) -> Self {
        Timepoint(value)
    }
}

impl From<Timepoint> for DateTime<Utc> {
    fn from(value: Timepoint) -> Self {
        value.0
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(&self.0))
    }
}

impl Serialize for Timepoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TYPE_NAME, &format(&self.0))
    }
}

impl<'de> Deserialize<'de> for Timepoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(TYPE_NAME, TimepointVisitor)
    }
}

struct TimepointVisitor;

impl<'de> Visitor<'de> for TimepointVisitor {
    type Value = Timepoint;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an ISO-8601 time point")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timepoint, E> {
        parse(v).map(Timepoint).map_err(E::custom)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Timepoint, D::Error> {
        d.deserialize_str(TimepointVisitor)
    }
}

/// `#[serde(with = "timepoint")]` support for `DateTime<Utc>` fields.
pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    Timepoint(*value).serialize(serializer)
}

/// `#[serde(with = "timepoint")]` support for `DateTime<Utc>` fields.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    Timepoint::deserialize(deserializer).map(Timepoint::into_inner)
}

/// `#[serde(with = "timepoint::option", default)]` support for
/// `Option<DateTime<Utc>>` fields.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timepoint;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&Timepoint(*dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<Timepoint>::deserialize(deserializer).map(|tp| tp.map(Timepoint::into_inner))
    }
}
