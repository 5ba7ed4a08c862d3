//! Loading the dataset from a local JSON export.
//!
//! Two shapes are accepted: a bare array of report rows, or an object
//! with a `reports` array and optional `comments` and `points` entries,
//! each given either as an array of rows or as a plain count. Rows may use
//! the backend's `snake_case` column names or `camelCase` keys.

use std::path::Path;

use serde::Deserialize;
use tombo_analytics::most_recent;
use tombo_analytics_models::TableCounts;
use tombo_report_models::IncidentRecord;

use crate::{DashboardData, SourceError};

#[derive(Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Reports(Vec<IncidentRecord>),
    Tables {
        reports: Vec<IncidentRecord>,
        #[serde(default)]
        comments: Option<TableSize>,
        #[serde(default)]
        points: Option<TableSize>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableSize {
    Count(u64),
    Rows(Vec<serde_json::Value>),
}

impl TableSize {
    fn count(&self) -> u64 {
        match self {
            Self::Count(count) => *count,
            Self::Rows(rows) => rows.len() as u64,
        }
    }
}

fn size(table: Option<&TableSize>) -> u64 {
    table.map_or(0, TableSize::count)
}

/// Parses an export document. The recent list holds the `recent_limit`
/// newest reports.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the document matches neither shape.
pub fn parse_export(json: &str, recent_limit: usize) -> Result<DashboardData, SourceError> {
    let (reports, comments, points) = match serde_json::from_str(json)? {
        ExportFile::Reports(reports) => (reports, 0, 0),
        ExportFile::Tables {
            reports,
            comments,
            points,
        } => (reports, size(comments.as_ref()), size(points.as_ref())),
    };

    Ok(DashboardData {
        recent: most_recent(&reports, recent_limit),
        counts: TableCounts {
            reports: reports.len() as u64,
            comments,
            points,
        },
        reports,
    })
}

/// Reads and parses the export at `path`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed.
pub fn load_export(path: &Path, recent_limit: usize) -> Result<DashboardData, SourceError> {
    let json = std::fs::read_to_string(path)?;
    let data = parse_export(&json, recent_limit)?;
    log::info!(
        "Loaded {} reports from {}",
        data.reports.len(),
        path.display()
    );
    Ok(data)
}
