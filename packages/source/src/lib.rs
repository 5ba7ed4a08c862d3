#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Backend and export loaders for the Tombo report dataset.
//!
//! The dashboard loads its data exactly once per session: every row of
//! `reports`, the latest reports for the "recent" list, and the row counts
//! of `comments` and `points`. [`backend::BackendClient`] fetches these
//! from the hosted backend's REST interface; [`export::load_export`]
//! reads the same data from a local JSON export. Either way the result is
//! a [`DashboardData`], and [`LoadState`] tracks the load lifecycle.

pub mod backend;
pub mod config;
pub mod export;
pub mod progress;
pub mod retry;

use std::path::PathBuf;
use std::sync::Arc;

use tombo_analytics_models::TableCounts;
use tombo_report_models::IncidentRecord;

use crate::backend::BackendClient;
use crate::config::BackendConfig;
use crate::progress::LoadProgress;

/// Errors that can occur while loading the dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The backend answered with an unusable response.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },
}

/// Everything the dashboard needs from one load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    /// Every report row.
    pub reports: Vec<IncidentRecord>,
    /// Latest reports, newest first.
    pub recent: Vec<IncidentRecord>,
    /// Table sizes.
    pub counts: TableCounts,
}

/// Lifecycle of the single dashboard load.
///
/// Starts as [`LoadState::Loading`] and moves exactly once, to either
/// [`LoadState::Ready`] or [`LoadState::Failed`].
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    /// The load is in flight.
    #[default]
    Loading,
    /// The load finished.
    Ready(Arc<DashboardData>),
    /// The load failed; the message is kept for display.
    Failed(String),
}

impl LoadState {
    /// Applies the outcome of the load.
    ///
    /// Only a [`LoadState::Loading`] state transitions. A second outcome
    /// for an already settled state is logged and ignored.
    #[must_use]
    pub fn finish(self, outcome: Result<DashboardData, SourceError>) -> Self {
        match self {
            Self::Loading => match outcome {
                Ok(data) => {
                    log::info!(
                        "Dashboard data ready: {} reports, {} comments, {} points",
                        data.counts.reports,
                        data.counts.comments,
                        data.counts.points,
                    );
                    Self::Ready(Arc::new(data))
                }
                Err(e) => {
                    log::error!("Failed to load dashboard data: {e}");
                    Self::Failed(e.to_string())
                }
            },
            settled => {
                log::warn!("Ignoring load outcome: dashboard data already settled");
                settled
            }
        }
    }

    /// The loaded data, if the load succeeded.
    #[must_use]
    pub fn data(&self) -> Option<&DashboardData> {
        match self {
            Self::Ready(data) => Some(data),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    /// The loaded reports. Empty while loading and after a failure, so the
    /// aggregator never sees a partial set.
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        match self.data() {
            Some(data) => &data.reports,
            None => &[],
        }
    }

    /// Short state name for status displays.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Number of backend requests [`load_dashboard_data`] makes.
const LOAD_STEPS: u64 = 4;

/// Loads reports, the recent list and the sibling table counts from the
/// backend.
///
/// # Errors
///
/// Returns [`SourceError`] if any of the backend requests fails.
pub async fn load_dashboard_data(
    client: &BackendClient,
    progress: &dyn LoadProgress,
) -> Result<DashboardData, SourceError> {
    progress.begin(LOAD_STEPS);

    progress.step("Fetching reports");
    let reports = client.fetch_reports().await?;

    progress.step("Fetching recent reports");
    let recent = client
        .fetch_recent_reports(client.config().recent_limit)
        .await?;

    progress.step("Counting comments");
    let comments = client.count_rows("comments").await?;

    progress.step("Counting points");
    let points = client.count_rows("points").await?;

    progress.finish(format!("Loaded {} reports", reports.len()));

    Ok(DashboardData {
        counts: TableCounts {
            reports: reports.len() as u64,
            comments,
            points,
        },
        reports,
        recent,
    })
}

/// Environment variable naming a JSON export to load instead of the
/// backend.
pub const EXPORT_VAR: &str = "TOMBO_EXPORT";

/// Where the dashboard data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// The hosted backend.
    Backend(BackendConfig),
    /// A local JSON export.
    Export {
        /// Export file.
        path: PathBuf,
        /// Number of reports in the recent list.
        recent_limit: usize,
    },
}

impl DataSource {
    /// Picks the export named by [`EXPORT_VAR`] if set, the backend
    /// configured through the environment otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if neither is configured.
    pub fn from_env() -> Result<Self, SourceError> {
        match std::env::var(EXPORT_VAR) {
            Ok(path) if !path.trim().is_empty() => Ok(Self::Export {
                path: PathBuf::from(path),
                recent_limit: config::DEFAULT_RECENT_LIMIT as usize,
            }),
            _ => Ok(Self::Backend(BackendConfig::from_env()?)),
        }
    }
}

/// Loads the dashboard data from `source`.
///
/// # Errors
///
/// Returns [`SourceError`] if the load fails.
pub async fn load(
    source: &DataSource,
    progress: &dyn LoadProgress,
) -> Result<DashboardData, SourceError> {
    match source {
        DataSource::Backend(config) => {
            log::info!("Loading dashboard data from {}", config.url);
            let client = BackendClient::new(config.clone())?;
            load_dashboard_data(&client, progress).await
        }
        DataSource::Export { path, recent_limit } => {
            progress.begin(1);
            progress.step("Reading export");
            let data = export::load_export(path, *recent_limit)?;
            progress.finish(format!("Loaded {} reports", data.reports.len()));
            Ok(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::progress::LogProgress;

    fn data() -> DashboardData {
        DashboardData {
            reports: vec![IncidentRecord::new("1"), IncidentRecord::new("2")],
            recent: vec![],
            counts: TableCounts {
                reports: 2,
                comments: 0,
                points: 0,
            },
        }
    }

    #[test]
    fn loading_has_no_records() {
        let state = LoadState::default();
        assert_eq!(state.label(), "loading");
        assert!(state.records().is_empty());
    }

    #[test]
    fn loading_transitions_to_ready() {
        let state = LoadState::Loading.finish(Ok(data()));
        assert_eq!(state.label(), "ready");
        assert_eq!(state.records().len(), 2);
    }

    #[test]
    fn loading_transitions_to_failed_with_empty_records() {
        let state = LoadState::Loading.finish(Err(SourceError::Backend {
            message: "HTTP 503".to_string(),
        }));
        assert_eq!(state.label(), "failed");
        assert!(state.records().is_empty());
        match state {
            LoadState::Failed(message) => assert!(message.contains("HTTP 503")),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn settled_state_does_not_transition_again() {
        let failed = LoadState::Loading.finish(Err(SourceError::Config {
            message: "missing url".to_string(),
        }));
        let still_failed = failed.finish(Ok(data()));
        assert_eq!(still_failed.label(), "failed");

        let ready = LoadState::Loading.finish(Ok(data()));
        let still_ready = ready.finish(Err(SourceError::Backend {
            message: "late".to_string(),
        }));
        assert_eq!(still_ready.records().len(), 2);
    }

    #[tokio::test]
    async fn loads_from_export_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"reports": [{"id": "a"}], "points": 3}"#)
            .unwrap();
        let source = DataSource::Export {
            path: file.path().to_path_buf(),
            recent_limit: 5,
        };

        let state = LoadState::Loading.finish(load(&source, &LogProgress).await);

        assert_eq!(state.label(), "ready");
        assert_eq!(state.data().unwrap().counts.points, 3);
    }

    #[tokio::test]
    async fn unreadable_export_fails_the_load() {
        let source = DataSource::Export {
            path: PathBuf::from("/nonexistent/tombo-export.json"),
            recent_limit: 5,
        };

        let state = LoadState::Loading.finish(load(&source, &LogProgress).await);

        assert_eq!(state.label(), "failed");
        assert!(state.records().is_empty());
    }
}
