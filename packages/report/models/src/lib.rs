#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident report record, report type taxonomy and filter criteria types.
//!
//! These are the shapes shared by every Tombo crate: the backend loader
//! deserializes rows of the `reports` table into [`IncidentRecord`], the
//! aggregator reads them, and the API and CLI pass [`FilterCriteria`]
//! through unchanged.
//!
//! Records are deserialized leniently. The backend is not under our
//! control, so a malformed timestamp or coordinate becomes `None` instead
//! of failing the whole load.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Label used in groupings for records that carry no report type.
pub const UNSPECIFIED_TYPE_LABEL: &str = "unknown";

/// Known report categories.
///
/// The category set on the backend is open-ended, so records keep their
/// raw type string; this enum names the categories the dashboard charts
/// break out individually.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportType {
    /// Taking property by force or threat
    Robbery,
    /// Physical attack
    Assault,
    /// Taking property without force
    Theft,
    /// Damage to property
    Vandalism,
    /// Suspicious person or activity
    Suspicious,
    /// Anything else the reporter filed explicitly as "other"
    Other,
}

impl ReportType {
    /// Returns all variants of this enum, in chart order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Robbery,
            Self::Assault,
            Self::Theft,
            Self::Vandalism,
            Self::Suspicious,
            Self::Other,
        ]
    }
}

/// Processing status of a report, derived from its process timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    /// Nobody has started triaging the report.
    Pending,
    /// Triage started but the report is not resolved yet.
    InProgress,
    /// The report has a resolution timestamp.
    Resolved,
}

/// One row of the `reports` table.
///
/// Serializes as `camelCase`. Deserialization accepts both the backend's
/// `snake_case` column names and `camelCase` (local exports).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Opaque identifier. Numeric ids are kept in their decimal form.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    /// Raw report category. Empty strings are treated as absent.
    #[serde(default, alias = "report_type", deserialize_with = "lenient_text")]
    pub report_type: Option<String>,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// Free-text address.
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    /// Latitude in degrees.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// When the report was filed.
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When triage started.
    #[serde(default, alias = "process_start", deserialize_with = "lenient_timestamp")]
    pub process_start: Option<DateTime<Utc>>,
    /// When the report was resolved.
    #[serde(default, alias = "process_end", deserialize_with = "lenient_timestamp")]
    pub process_end: Option<DateTime<Utc>>,
    /// Reporter identifier.
    #[serde(default, alias = "user_id", deserialize_with = "lenient_text")]
    pub user_id: Option<String>,
}

impl IncidentRecord {
    /// Creates a record with only an id set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            report_type: None,
            description: None,
            address: None,
            latitude: None,
            longitude: None,
            created_at: None,
            process_start: None,
            process_end: None,
            user_id: None,
        }
    }

    /// Derives the processing status from the process timestamps.
    ///
    /// A resolution timestamp wins regardless of whether triage was ever
    /// recorded as started.
    #[must_use]
    pub const fn status(&self) -> ReportStatus {
        if self.process_end.is_some() {
            ReportStatus::Resolved
        } else if self.process_start.is_some() {
            ReportStatus::InProgress
        } else {
            ReportStatus::Pending
        }
    }

    /// Returns the report type, or [`UNSPECIFIED_TYPE_LABEL`] when absent.
    #[must_use]
    pub fn type_label(&self) -> &str {
        self.report_type
            .as_deref()
            .unwrap_or(UNSPECIFIED_TYPE_LABEL)
    }

    /// Returns the report type if it is one of the known categories.
    #[must_use]
    pub fn known_type(&self) -> Option<ReportType> {
        self.report_type.as_deref()?.parse().ok()
    }

    /// Hours between triage start and resolution, if both are recorded.
    ///
    /// Negative when the timestamps are inverted.
    #[must_use]
    pub fn resolution_hours(&self) -> Option<f64> {
        let start = self.process_start?;
        let end = self.process_end?;
        #[allow(clippy::cast_precision_loss)]
        let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
        Some(hours)
    }
}

/// Report type restriction of a [`FilterCriteria`].
///
/// Travels as a plain string: `"all"` (or an empty string) means no
/// restriction, anything else must equal the record's type exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeFilter {
    /// Every report type passes, including absent ones.
    #[default]
    All,
    /// Only records whose type equals this string pass.
    Only(String),
}

impl TypeFilter {
    /// Returns `true` if a record with the given type passes this filter.
    #[must_use]
    pub fn matches(&self, report_type: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => report_type == Some(wanted.as_str()),
        }
    }
}

impl From<String> for TypeFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == "all" {
            Self::All
        } else {
            Self::Only(value)
        }
    }
}

impl From<&str> for TypeFilter {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<TypeFilter> for String {
    fn from(value: TypeFilter) -> Self {
        match value {
            TypeFilter::All => "all".to_string(),
            TypeFilter::Only(report_type) => report_type,
        }
    }
}

/// User-selected restrictions on the displayed record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Report type restriction.
    #[serde(default)]
    pub report_type: TypeFilter,
    /// Inclusive lower bound, from the start of this day.
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound, through the end of this day.
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    /// Returns `true` if these criteria let every record through.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self.report_type, TypeFilter::All)
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// Parses a backend timestamp.
///
/// Accepts RFC 3339, the Postgres text form (`2024-01-15 14:30:00+00`),
/// offset-less datetimes (taken as UTC) and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}
