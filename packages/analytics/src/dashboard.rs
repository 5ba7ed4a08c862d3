//! Map projection, recent-report list and the composed dashboard snapshot.

use std::cmp::Reverse;

use chrono::TimeZone;
use tombo_analytics_models::{DashboardSnapshot, MapPoint, TableCounts};
use tombo_report_models::{FilterCriteria, IncidentRecord};

use crate::aggregate::{
    average_resolution_hours, count_by_status, group_by_calendar_date, group_by_hour_and_type,
    group_by_month, group_by_type, group_by_weekday, heatmap_last_90_days,
    inverted_resolution_count, resolution_by_type,
};
use crate::filter::{apply_filters, distinct_types};

/// Returns the coordinates of `record` if they can be plotted.
///
/// Returns `None` if either coordinate is missing, zero, or out of range.
fn plottable(record: &IncidentRecord) -> Option<(f64, f64)> {
    let latitude = record.latitude?;
    let longitude = record.longitude?;
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    Some((latitude, longitude))
}

/// Projects the records that can be placed on the map.
#[must_use]
pub fn map_points(records: &[IncidentRecord]) -> Vec<MapPoint> {
    records
        .iter()
        .filter_map(|record| {
            let (latitude, longitude) = plottable(record)?;
            Some(MapPoint {
                id: record.id.clone(),
                report_type: record.report_type.clone(),
                latitude,
                longitude,
                status: record.status(),
                address: record.address.clone(),
            })
        })
        .collect()
}

/// The `limit` newest records, newest first. Records without a creation
/// time sort last; ties keep input order.
#[must_use]
pub fn most_recent(records: &[IncidentRecord], limit: usize) -> Vec<IncidentRecord> {
    let mut sorted: Vec<&IncidentRecord> = records.iter().collect();
    sorted.sort_by_key(|record| Reverse(record.created_at));
    sorted.into_iter().take(limit).cloned().collect()
}

/// Computes every dashboard view over the records passing `criteria`.
///
/// `recent` and `table_counts` come from the loader unchanged. The list of
/// report types is taken from the unfiltered records so the type picker
/// keeps offering every choice while a filter is active.
#[must_use]
pub fn build_dashboard<Tz: TimeZone>(
    records: &[IncidentRecord],
    recent: &[IncidentRecord],
    table_counts: TableCounts,
    criteria: &FilterCriteria,
    tz: &Tz,
) -> DashboardSnapshot {
    let filtered = apply_filters(records, criteria, tz);
    let inverted_resolutions = inverted_resolution_count(&filtered);

    log::debug!(
        "Building dashboard over {} of {} reports ({} with inverted resolution times)",
        filtered.len(),
        records.len(),
        inverted_resolutions,
    );

    DashboardSnapshot {
        filters: criteria.clone(),
        total_reports: filtered.len() as u64,
        table_counts,
        status: count_by_status(&filtered),
        average_resolution_hours: average_resolution_hours(&filtered),
        inverted_resolutions,
        by_type: group_by_type(&filtered),
        resolution_by_type: resolution_by_type(&filtered),
        by_date: group_by_calendar_date(&filtered, tz),
        by_month: group_by_month(&filtered, tz),
        by_weekday: group_by_weekday(&filtered, tz),
        by_hour: group_by_hour_and_type(&filtered, tz),
        heatmap: heatmap_last_90_days(&filtered, tz),
        map_points: map_points(&filtered),
        report_types: distinct_types(records).into_iter().collect(),
        recent: recent.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tombo_report_models::TypeFilter;

    use super::*;
    use crate::fixtures::{report, ts};

    fn located(id: &str, latitude: Option<f64>, longitude: Option<f64>) -> IncidentRecord {
        let mut record = report(id, Some("theft"), Some("2024-01-01T10:00:00Z"));
        record.latitude = latitude;
        record.longitude = longitude;
        record
    }

    #[test]
    fn map_points_reject_unusable_coordinates() {
        let records = vec![
            located("ok", Some(-12.046), Some(-77.043)),
            located("missing", None, Some(-77.043)),
            located("zero", Some(0.0), Some(-77.043)),
            located("range", Some(95.0), Some(-77.043)),
        ];
        let points = map_points(&records);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "ok");
    }

    #[test]
    fn most_recent_orders_newest_first() {
        let records = vec![
            report("old", None, Some("2024-01-01T00:00:00Z")),
            report("undated", None, None),
            report("new", None, Some("2024-03-01T00:00:00Z")),
            report("mid", None, Some("2024-02-01T00:00:00Z")),
        ];
        let recent = most_recent(&records, 3);
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(most_recent(&records, 10).last().unwrap().id, "undated");
    }

    #[test]
    fn dashboard_is_computed_over_filtered_records() {
        let mut resolved = report("3", Some("robbery"), Some("2024-01-02T09:00:00Z"));
        resolved.process_start = Some(ts("2024-01-02T10:00:00Z"));
        resolved.process_end = Some(ts("2024-01-02T13:00:00Z"));
        let records = vec![
            report("1", Some("theft"), Some("2024-01-01T08:00:00Z")),
            report("2", Some("theft"), Some("2024-01-02T08:00:00Z")),
            resolved,
        ];
        let counts = TableCounts {
            reports: 3,
            comments: 7,
            points: 2,
        };
        let criteria = FilterCriteria {
            report_type: TypeFilter::from("robbery"),
            ..FilterCriteria::default()
        };

        let snapshot = build_dashboard(&records, &records[..1], counts, &criteria, &Utc);

        assert_eq!(snapshot.total_reports, 1);
        assert_eq!(snapshot.status.resolved, 1);
        assert!((snapshot.average_resolution_hours - 3.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.by_type.len(), 1);
        assert_eq!(snapshot.by_weekday.len(), 7);
        assert_eq!(snapshot.by_hour.len(), 24);
        assert_eq!(snapshot.report_types, vec!["robbery", "theft"]);
        assert_eq!(snapshot.table_counts, counts);
        assert_eq!(snapshot.recent.len(), 1);
        assert_eq!(snapshot.filters, criteria);
    }

    #[test]
    fn dashboard_of_empty_load_is_well_formed() {
        let snapshot = build_dashboard(
            &[],
            &[],
            TableCounts::default(),
            &FilterCriteria::default(),
            &Utc,
        );
        assert_eq!(snapshot.total_reports, 0);
        assert_eq!(snapshot.status.total(), 0);
        assert!(snapshot.average_resolution_hours.abs() < f64::EPSILON);
        assert!(snapshot.by_date.is_empty());
        assert_eq!(snapshot.by_weekday.len(), 7);
        assert_eq!(snapshot.by_hour.len(), 24);
        assert!(snapshot.heatmap.is_empty());
        assert!(serde_json::to_string(&snapshot).is_ok());
    }
}
