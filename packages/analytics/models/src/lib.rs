#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Chart-ready result types produced by the report aggregator.
//!
//! Every type here is a plain serializable row. The aggregator fills them
//! in, the API serves them as JSON and the chart components read them
//! without further shaping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tombo_report_models::{FilterCriteria, IncidentRecord, ReportStatus, ReportType};

/// Number of reports in each processing status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Reports nobody has started triaging.
    pub pending: u64,
    /// Reports being triaged.
    pub in_progress: u64,
    /// Resolved reports.
    pub resolved: u64,
}

impl StatusCounts {
    /// Adds one report with the given status.
    pub const fn record(&mut self, status: ReportStatus) {
        match status {
            ReportStatus::Pending => self.pending += 1,
            ReportStatus::InProgress => self.in_progress += 1,
            ReportStatus::Resolved => self.resolved += 1,
        }
    }

    /// Sum of all buckets.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.in_progress + self.resolved
    }
}

/// Number of reports of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    /// Report type, or the unspecified-type label.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Number of reports.
    pub count: u64,
}

/// Average resolution time of one report type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeResolution {
    /// Report type, or the unspecified-type label.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Mean hours from triage start to resolution, one decimal.
    pub avg_hours: f64,
}

/// Number of reports filed on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateCount {
    /// Day as `YYYY-MM-DD`.
    pub date: String,
    /// Number of reports.
    pub count: u64,
}

/// Number of reports filed in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCount {
    /// Sortable key, `YYYY-MM`.
    pub month_key: String,
    /// Display label, e.g. `Jan 2024`.
    pub label: String,
    /// Number of reports.
    pub count: u64,
}

/// Number of reports filed on one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// Short English weekday name (`Sun` .. `Sat`).
    pub day: String,
    /// Number of reports.
    pub count: u64,
}

/// Reports filed during one hour of the day, broken out by known type.
///
/// Serializes flat, e.g. `{"hour":"08","total":3,"robbery":1,"theft":2,...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourTypeCount {
    /// Two-digit hour, `00` .. `23`.
    pub hour: String,
    /// All reports in this hour, including unknown types.
    pub total: u64,
    /// One entry per [`ReportType`], always present.
    #[serde(flatten)]
    pub by_type: BTreeMap<ReportType, u64>,
}

impl HourTypeCount {
    /// Creates an empty bucket for `hour` with every known type at zero.
    #[must_use]
    pub fn empty(hour: u32) -> Self {
        Self {
            hour: format!("{hour:02}"),
            total: 0,
            by_type: ReportType::all().iter().map(|t| (*t, 0)).collect(),
        }
    }

    /// Count for one known type.
    #[must_use]
    pub fn count(&self, report_type: ReportType) -> u64 {
        self.by_type.get(&report_type).copied().unwrap_or(0)
    }
}

/// A report that can be placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    /// Report id.
    pub id: String,
    /// Raw report type.
    pub report_type: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Derived processing status.
    pub status: ReportStatus,
    /// Free-text address, for the popup.
    pub address: Option<String>,
}

/// Row counts of the three backend tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    /// Rows in `reports`.
    pub reports: u64,
    /// Rows in `comments`.
    pub comments: u64,
    /// Rows in `points`.
    pub points: u64,
}

/// Every derived view the dashboard renders, for one set of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Filters the views were computed under.
    pub filters: FilterCriteria,
    /// Reports passing the filters.
    pub total_reports: u64,
    /// Backend table sizes (unfiltered).
    pub table_counts: TableCounts,
    /// Status buckets.
    pub status: StatusCounts,
    /// Mean resolution time in hours, one decimal.
    pub average_resolution_hours: f64,
    /// Reports whose resolution precedes their triage start. These are left
    /// out of every resolution average.
    pub inverted_resolutions: u64,
    /// Counts by type, first-seen order.
    pub by_type: Vec<TypeCount>,
    /// Resolution averages by type.
    pub resolution_by_type: Vec<TypeResolution>,
    /// Counts by calendar day, ascending.
    pub by_date: Vec<DateCount>,
    /// Counts by month, ascending.
    pub by_month: Vec<MonthCount>,
    /// Seven weekday buckets, Sunday first.
    pub by_weekday: Vec<WeekdayCount>,
    /// Twenty-four hour buckets.
    pub by_hour: Vec<HourTypeCount>,
    /// Most recent 90 active days.
    pub heatmap: Vec<DateCount>,
    /// Reports with usable coordinates.
    pub map_points: Vec<MapPoint>,
    /// Report types present in the unfiltered data, for the filter picker.
    pub report_types: Vec<String>,
    /// Latest reports, newest first.
    pub recent: Vec<IncidentRecord>,
}
