//! Wire types for the visits API.
//!
//! The field names here are the server's contract: a page is
//! `{ "total": n, "data": [ { "id", "name", "date" } ] }`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

// ============================================================================
// Visit Identifier
// ============================================================================

/// Unique key of a visit.
///
/// The server has been seen to send numeric ids; string ids are accepted
/// so that a schema change does not break the pull.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisitId {
    /// Numeric identifier.
    Number(i64),
    /// Opaque string identifier.
    Text(String),
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VisitId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for VisitId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

// ============================================================================
// Visit
// ============================================================================

/// One visit record as returned by the API.
///
/// Fields the server sends beyond `id`, `name` and `date` are kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Unique key of the visit.
    pub id: VisitId,
    /// Display name of the visitor.
    pub name: String,
    /// When the visit happened, exactly as the server sent it.
    #[serde(default, skip_serializing_if = "VisitDate::is_missing")]
    pub date: VisitDate,
    /// Any other fields of the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Visit {
    /// Creates a new visit.
    pub fn new(id: impl Into<VisitId>, name: impl Into<String>, date: impl Into<VisitDate>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date: date.into(),
            extra: Map::new(),
        }
    }

    /// Returns the UTC calendar day of the visit, if its date can be read.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.parse().ok().map(|date| date.date_naive())
    }
}

// ============================================================================
// Page
// ============================================================================

/// One page of visits plus the server's running total across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitPage {
    /// Number of visits the server knew about when it served this page.
    #[serde(default)]
    pub total: u64,
    /// The visits on this page.
    #[serde(default)]
    pub data: Vec<Visit>,
}

impl VisitPage {
    /// Creates a page.
    pub fn new(total: u64, data: Vec<Visit>) -> Self {
        Self { total, data }
    }

    /// Number of visits on this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the page carries no visits.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// Date Handling
// ============================================================================

/// Naive date-time layouts read as UTC, most common first.
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A visit timestamp as the server sent it.
///
/// The raw JSON value is kept so documents are written back unchanged;
/// [`VisitDate::parse`] interprets it on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitDate(Value);

impl VisitDate {
    /// Wraps a raw JSON value.
    pub fn from_value(raw: Value) -> Self {
        Self(raw)
    }

    /// The raw value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Returns true if the server sent no date.
    pub fn is_missing(&self) -> bool {
        self.0.is_null()
    }

    /// Interprets the date.
    ///
    /// Strings go through [`parse_visit_date`]; numbers are milliseconds
    /// since the Unix epoch.
    pub fn parse(&self) -> Result<DateTime<Utc>, CoreError> {
        match &self.0 {
            Value::String(raw) => parse_visit_date(raw),
            Value::Number(millis) => millis
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| CoreError::InvalidData(format!("visit date out of range: {millis}"))),
            other => Err(CoreError::InvalidData(format!("unrecognized visit date: {other}"))),
        }
    }
}

impl From<DateTime<Utc>> for VisitDate {
    fn from(date: DateTime<Utc>) -> Self {
        Self(Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)))
    }
}

impl From<&str> for VisitDate {
    fn from(raw: &str) -> Self {
        Self(Value::String(raw.to_string()))
    }
}

/// Parses a visit timestamp.
///
/// Accepts RFC 3339, RFC 2822, naive date-times with a `T` or a space
/// separator and second or minute precision (read as UTC, a trailing `Z` is
/// allowed), and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_visit_date(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = raw.strip_suffix(['Z', 'z']).unwrap_or(raw);
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(CoreError::InvalidData(format!(
        "unrecognized visit date: {raw:?}"
    )))
}
