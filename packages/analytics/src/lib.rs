#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report aggregation and filtering engine for the Tombo dashboard.
//!
//! Every public function is a pure, synchronous transform over a slice of
//! [`IncidentRecord`]s that is already resident in memory. None of them
//! can fail: absent or malformed fields are skipped, never rejected.
//!
//! Functions that bucket by calendar time take the time zone whose
//! calendar defines "day", "month", "weekday" and "hour". Callers pass
//! [`chrono::Local`] for the machine's zone, or a fixed offset.
//!
//! [`IncidentRecord`]: tombo_report_models::IncidentRecord

pub mod aggregate;
pub mod dashboard;
pub mod filter;

pub use aggregate::{
    average_resolution_hours, count_by_status, group_by_calendar_date, group_by_hour_and_type,
    group_by_month, group_by_type, group_by_weekday, heatmap_last_90_days,
    inverted_resolution_count, resolution_by_type,
};
pub use dashboard::{build_dashboard, map_points, most_recent};
pub use filter::{apply_filters, distinct_types, passes};

/// Number of distinct active days kept by [`heatmap_last_90_days`].
pub const HEATMAP_DAYS: usize = 90;

/// Rounds to one decimal place, the precision the dashboard displays.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
