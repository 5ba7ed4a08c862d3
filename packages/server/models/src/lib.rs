#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the Tombo dashboard server.
//!
//! The dashboard views themselves are served as
//! [`tombo_analytics_models::DashboardSnapshot`]; the types here cover
//! query parameters and the small status responses.

use serde::{Deserialize, Serialize};

/// Query parameters shared by the dashboard and reports endpoints.
///
/// Dates are kept as strings so malformed values can be reported back to
/// the caller instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQueryParams {
    /// Exact report type, or `all`.
    pub report_type: Option<String>,
    /// First local calendar day to include (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    /// Last local calendar day to include (`YYYY-MM-DD`).
    pub date_to: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Report types available for filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTypes {
    /// Types present in the loaded reports, sorted.
    pub present: Vec<String>,
    /// Types the dashboard charts break out individually.
    pub known: Vec<String>,
}

/// State of the dataset load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ApiStatus {
    /// The load is in flight.
    Loading,
    /// The data is loaded.
    Ready {
        /// Rows in `reports`.
        reports: u64,
        /// Rows in `comments`.
        comments: u64,
        /// Rows in `points`.
        points: u64,
    },
    /// The load failed and every view is empty.
    Failed {
        /// Why the load failed.
        message: String,
    },
}

/// Error body returned with 4xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_tagged_by_state() {
        let ready = ApiStatus::Ready {
            reports: 3,
            comments: 1,
            points: 0,
        };
        assert_eq!(
            serde_json::to_value(&ready).unwrap(),
            serde_json::json!({"state": "ready", "reports": 3, "comments": 1, "points": 0})
        );
        assert_eq!(
            serde_json::to_value(ApiStatus::Loading).unwrap(),
            serde_json::json!({"state": "loading"})
        );
    }

    #[test]
    fn query_params_use_camel_case() {
        let params: DashboardQueryParams = serde_json::from_value(serde_json::json!({
            "reportType": "theft",
            "dateFrom": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(params.report_type.as_deref(), Some("theft"));
        assert_eq!(params.date_from.as_deref(), Some("2024-01-01"));
        assert!(params.date_to.is_none());
    }
}
