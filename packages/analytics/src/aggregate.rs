//! Counts, groupings and resolution statistics over a report list.
//!
//! Groupings over open-ended domains (types, days, months) only emit
//! buckets that have reports. Groupings over fixed domains (weekdays,
//! hours) always emit every bucket.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike as _, NaiveDate, NaiveDateTime, TimeZone, Timelike as _};
use tombo_analytics_models::{
    DateCount, HourTypeCount, MonthCount, StatusCounts, TypeCount, TypeResolution, WeekdayCount,
};
use tombo_report_models::IncidentRecord;

use crate::{HEATMAP_DAYS, round_one_decimal};

/// Weekday labels indexed by days from Sunday.
const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Wall-clock creation time of `record` in `tz`, if it has one.
fn local_created_at<Tz: TimeZone>(record: &IncidentRecord, tz: &Tz) -> Option<NaiveDateTime> {
    record
        .created_at
        .map(|created| created.with_timezone(tz).naive_local())
}

/// Resolution hours that count towards averages. Inverted timestamp pairs
/// are left out.
fn usable_resolution_hours(record: &IncidentRecord) -> Option<f64> {
    record.resolution_hours().filter(|hours| *hours >= 0.0)
}

/// Partitions records into pending / in-progress / resolved.
#[must_use]
pub fn count_by_status(records: &[IncidentRecord]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for record in records {
        counts.record(record.status());
    }
    counts
}

/// Mean hours from triage start to resolution, one decimal.
///
/// Only records with both timestamps in order contribute. Returns `0.0`
/// when none do.
#[must_use]
pub fn average_resolution_hours(records: &[IncidentRecord]) -> f64 {
    mean(records.iter().filter_map(usable_resolution_hours)).map_or(0.0, round_one_decimal)
}

/// Number of records whose resolution timestamp precedes their triage start.
#[must_use]
pub fn inverted_resolution_count(records: &[IncidentRecord]) -> u64 {
    records
        .iter()
        .filter_map(IncidentRecord::resolution_hours)
        .filter(|hours| *hours < 0.0)
        .count() as u64
}

/// Counts records per report type, in the order each type first appears.
///
/// Records without a type are counted under
/// [`tombo_report_models::UNSPECIFIED_TYPE_LABEL`].
#[must_use]
pub fn group_by_type(records: &[IncidentRecord]) -> Vec<TypeCount> {
    let mut groups = FirstSeen::default();
    for record in records {
        groups.entry(record.type_label()).count += 1;
    }
    groups
        .into_rows()
        .map(|(report_type, acc)| TypeCount {
            report_type,
            count: acc.count,
        })
        .collect()
}

/// Mean resolution hours per report type, in first-seen order.
///
/// Types with no record carrying an in-order pair of process timestamps
/// are omitted.
#[must_use]
pub fn resolution_by_type(records: &[IncidentRecord]) -> Vec<TypeResolution> {
    let mut groups = FirstSeen::default();
    for record in records {
        if let Some(hours) = usable_resolution_hours(record) {
            let acc = groups.entry(record.type_label());
            acc.count += 1;
            acc.sum += hours;
        }
    }
    groups
        .into_rows()
        .map(|(report_type, acc)| {
            #[allow(clippy::cast_precision_loss)]
            let avg = acc.sum / acc.count as f64;
            TypeResolution {
                report_type,
                avg_hours: round_one_decimal(avg),
            }
        })
        .collect()
}

/// Counts records per local calendar day, ascending.
///
/// Days without reports are not emitted.
#[must_use]
pub fn group_by_calendar_date<Tz: TimeZone>(records: &[IncidentRecord], tz: &Tz) -> Vec<DateCount> {
    count_days(records, tz)
        .into_iter()
        .map(|(date, count)| DateCount {
            date: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect()
}

/// Counts records per local calendar month, ascending by `YYYY-MM`.
#[must_use]
pub fn group_by_month<Tz: TimeZone>(records: &[IncidentRecord], tz: &Tz) -> Vec<MonthCount> {
    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for created in records.iter().filter_map(|r| local_created_at(r, tz)) {
        *months.entry((created.year(), created.month())).or_insert(0) += 1;
    }
    months
        .into_iter()
        .map(|((year, month), count)| {
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map_or_else(String::new, |first| first.format("%b %Y").to_string());
            MonthCount {
                month_key: format!("{year:04}-{month:02}"),
                label,
                count,
            }
        })
        .collect()
}

/// Counts records per local weekday. Always seven rows, Sunday first.
#[must_use]
pub fn group_by_weekday<Tz: TimeZone>(records: &[IncidentRecord], tz: &Tz) -> Vec<WeekdayCount> {
    let mut counts = [0u64; 7];
    for created in records.iter().filter_map(|r| local_created_at(r, tz)) {
        counts[created.weekday().num_days_from_sunday() as usize] += 1;
    }
    WEEKDAY_LABELS
        .iter()
        .zip(counts)
        .map(|(day, count)| WeekdayCount {
            day: (*day).to_string(),
            count,
        })
        .collect()
}

/// Counts records per local hour of day, broken out by known report type.
///
/// Always 24 rows. Records whose type is absent or outside the known set
/// only add to `total`.
#[must_use]
pub fn group_by_hour_and_type<Tz: TimeZone>(
    records: &[IncidentRecord],
    tz: &Tz,
) -> Vec<HourTypeCount> {
    let mut hours: Vec<HourTypeCount> = (0..24).map(HourTypeCount::empty).collect();
    for record in records {
        let Some(created) = local_created_at(record, tz) else {
            continue;
        };
        let bucket = &mut hours[created.hour() as usize];
        bucket.total += 1;
        if let Some(known) = record.known_type() {
            *bucket.by_type.entry(known).or_insert(0) += 1;
        }
    }
    hours
}

/// Daily counts for the most recent [`HEATMAP_DAYS`] days that have
/// reports, ascending.
///
/// This is a window over active days, not over the calendar: quiet days
/// don't use up the window.
#[must_use]
pub fn heatmap_last_90_days<Tz: TimeZone>(records: &[IncidentRecord], tz: &Tz) -> Vec<DateCount> {
    let mut days = group_by_calendar_date(records, tz);
    let skip = days.len().saturating_sub(HEATMAP_DAYS);
    days.split_off(skip)
}

fn count_days<Tz: TimeZone>(records: &[IncidentRecord], tz: &Tz) -> BTreeMap<NaiveDate, u64> {
    let mut days = BTreeMap::new();
    for created in records.iter().filter_map(|r| local_created_at(r, tz)) {
        *days.entry(created.date()).or_insert(0) += 1;
    }
    days
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Default)]
struct GroupAccum {
    count: u64,
    sum: f64,
}

/// Groups keyed by label, remembering the order labels first appeared in.
#[derive(Default)]
struct FirstSeen {
    index: HashMap<String, usize>,
    rows: Vec<(String, GroupAccum)>,
}

impl FirstSeen {
    fn entry(&mut self, label: &str) -> &mut GroupAccum {
        let idx = match self.index.get(label).copied() {
            Some(idx) => idx,
            None => {
                self.rows.push((label.to_string(), GroupAccum::default()));
                self.index.insert(label.to_string(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        &mut self.rows[idx].1
    }

    fn into_rows(self) -> impl Iterator<Item = (String, GroupAccum)> {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use tombo_report_models::{ReportType, UNSPECIFIED_TYPE_LABEL};

    use super::*;
    use crate::fixtures::{processed, report};

    fn example_records() -> Vec<IncidentRecord> {
        vec![
            report("1", Some("theft"), Some("2024-01-01T10:00:00Z")),
            report("2", Some("theft"), Some("2024-01-02T11:00:00Z")),
            report("3", Some("robbery"), Some("2024-01-02T18:30:00Z")),
        ]
    }

    #[test]
    fn status_buckets_cover_every_record() {
        let records = vec![
            processed("1", None, None, None),
            processed("2", None, Some("2024-01-01T01:00:00Z"), None),
            processed("3", None, Some("2024-01-01T01:00:00Z"), Some("2024-01-01T02:00:00Z")),
            processed("4", None, None, Some("2024-01-01T02:00:00Z")),
        ];
        let counts = count_by_status(&records);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.resolved, 2);
        assert_eq!(counts.total(), records.len() as u64);
        assert_eq!(count_by_status(&[]).total(), 0);
    }

    #[test]
    fn average_resolution_of_empty_set_is_zero() {
        assert!(average_resolution_hours(&[]).abs() < f64::EPSILON);
        let unresolved = vec![processed("1", None, Some("2024-01-01T01:00:00Z"), None)];
        assert!(average_resolution_hours(&unresolved).abs() < f64::EPSILON);
    }

    #[test]
    fn average_resolution_of_two_hour_record() {
        let records = vec![processed(
            "1",
            Some("theft"),
            Some("2024-01-01T10:00:00Z"),
            Some("2024-01-01T12:00:00Z"),
        )];
        assert!((average_resolution_hours(&records) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_resolution_rounds_to_one_decimal() {
        let records = vec![
            processed("1", None, Some("2024-01-01T10:00:00Z"), Some("2024-01-01T11:00:00Z")),
            processed("2", None, Some("2024-01-01T10:00:00Z"), Some("2024-01-01T11:10:00Z")),
        ];
        // (1.0 + 1.1666) / 2 = 1.0833
        assert!((average_resolution_hours(&records) - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn inverted_resolutions_are_excluded_and_counted() {
        let records = vec![
            processed("1", Some("theft"), Some("2024-01-01T10:00:00Z"), Some("2024-01-01T14:00:00Z")),
            processed("2", Some("theft"), Some("2024-01-01T10:00:00Z"), Some("2024-01-01T08:00:00Z")),
        ];
        assert!((average_resolution_hours(&records) - 4.0).abs() < f64::EPSILON);
        assert_eq!(inverted_resolution_count(&records), 1);
        assert_eq!(count_by_status(&records).resolved, 2);
    }

    #[test]
    fn groups_by_type_in_first_seen_order() {
        let groups = group_by_type(&example_records());
        assert_eq!(
            groups,
            vec![
                TypeCount {
                    report_type: "theft".to_string(),
                    count: 2
                },
                TypeCount {
                    report_type: "robbery".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn type_groups_sum_to_record_count() {
        let mut records = example_records();
        records.push(report("4", None, None));
        records.push(report("5", Some("fraud"), Some("2024-02-01T00:00:00Z")));
        let groups = group_by_type(&records);
        let total: u64 = groups.iter().map(|g| g.count).sum();
        assert_eq!(total, records.len() as u64);
        assert!(groups.iter().any(|g| g.report_type == UNSPECIFIED_TYPE_LABEL));
    }

    #[test]
    fn resolution_by_type_skips_types_without_resolutions() {
        let records = vec![
            processed("1", Some("theft"), Some("2024-01-01T10:00:00Z"), Some("2024-01-01T13:00:00Z")),
            processed("2", Some("robbery"), Some("2024-01-01T10:00:00Z"), None),
            processed("3", Some("theft"), Some("2024-01-01T10:00:00Z"), Some("2024-01-01T11:00:00Z")),
            processed("4", None, Some("2024-01-01T10:00:00Z"), Some("2024-01-01T10:30:00Z")),
        ];
        let rows = resolution_by_type(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].report_type, "theft");
        assert!((rows[0].avg_hours - 2.0).abs() < f64::EPSILON);
        assert_eq!(rows[1].report_type, UNSPECIFIED_TYPE_LABEL);
        assert!((rows[1].avg_hours - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn resolution_by_type_ignores_inverted_pairs() {
        let records = vec![
            processed("1", Some("theft"), Some("2024-01-01T10:00:00Z"), Some("2024-01-01T12:00:00Z")),
            processed("2", Some("theft"), Some("2024-01-01T12:00:00Z"), Some("2024-01-01T02:00:00Z")),
            processed("3", Some("robbery"), Some("2024-01-01T15:00:00Z"), Some("2024-01-01T09:00:00Z")),
        ];
        let rows = resolution_by_type(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report_type, "theft");
        assert!((rows[0].avg_hours - 2.0).abs() < f64::EPSILON);
        assert_eq!(inverted_resolution_count(&records), 2);
    }

    #[test]
    fn groups_by_calendar_date_ascending() {
        let mut records = example_records();
        records.reverse();
        assert_eq!(
            group_by_calendar_date(&records, &Utc),
            vec![
                DateCount {
                    date: "2024-01-01".to_string(),
                    count: 1
                },
                DateCount {
                    date: "2024-01-02".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn calendar_date_follows_time_zone() {
        // 18:30 UTC on Jan 2 is already Jan 3 at UTC+8.
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let days = group_by_calendar_date(&example_records(), &tz);
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn records_without_created_at_are_not_time_bucketed() {
        let records = vec![report("1", Some("theft"), None)];
        assert!(group_by_calendar_date(&records, &Utc).is_empty());
        assert!(group_by_month(&records, &Utc).is_empty());
        assert!(group_by_weekday(&records, &Utc).iter().all(|d| d.count == 0));
        assert!(group_by_hour_and_type(&records, &Utc).iter().all(|h| h.total == 0));
        assert_eq!(count_by_status(&records).pending, 1);
    }

    #[test]
    fn groups_by_month_with_sortable_keys() {
        let records = vec![
            report("1", None, Some("2024-03-05T00:00:00Z")),
            report("2", None, Some("2023-12-31T23:00:00Z")),
            report("3", None, Some("2024-03-20T00:00:00Z")),
        ];
        let months = group_by_month(&records, &Utc);
        assert_eq!(
            months,
            vec![
                MonthCount {
                    month_key: "2023-12".to_string(),
                    label: "Dec 2023".to_string(),
                    count: 1
                },
                MonthCount {
                    month_key: "2024-03".to_string(),
                    label: "Mar 2024".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn weekday_grouping_is_fixed_length() {
        let empty = group_by_weekday(&[], &Utc);
        assert_eq!(empty.len(), 7);
        assert_eq!(empty[0].day, "Sun");
        assert_eq!(empty[6].day, "Sat");
        assert!(empty.iter().all(|d| d.count == 0));

        // 2024-01-01 was a Monday, 2024-01-02 a Tuesday.
        let days = group_by_weekday(&example_records(), &Utc);
        assert_eq!(days.len(), 7);
        assert_eq!(days[1].count, 1);
        assert_eq!(days[2].count, 2);
    }

    #[test]
    fn hour_grouping_is_fixed_length() {
        let empty = group_by_hour_and_type(&[], &Utc);
        assert_eq!(empty.len(), 24);
        assert_eq!(empty[0].hour, "00");
        assert_eq!(empty[23].hour, "23");
        assert!(empty.iter().all(|h| h.total == 0));
    }

    #[test]
    fn hour_grouping_breaks_out_known_types() {
        let records = vec![
            report("1", Some("theft"), Some("2024-01-01T10:05:00Z")),
            report("2", Some("fraud"), Some("2024-01-01T10:45:00Z")),
            report("3", None, Some("2024-01-01T10:59:59Z")),
            report("4", Some("other"), Some("2024-01-01T23:00:00Z")),
        ];
        let hours = group_by_hour_and_type(&records, &Utc);
        assert_eq!(hours[10].total, 3);
        assert_eq!(hours[10].count(ReportType::Theft), 1);
        let named: u64 = hours[10].by_type.values().sum();
        assert_eq!(named, 1);
        assert_eq!(hours[23].count(ReportType::Other), 1);
    }

    #[test]
    fn heatmap_returns_only_present_days() {
        let records: Vec<IncidentRecord> = (1..=5)
            .map(|day| {
                report(
                    &day.to_string(),
                    None,
                    Some(&format!("2024-02-{:02}T12:00:00Z", day * 3)),
                )
            })
            .collect();
        assert_eq!(heatmap_last_90_days(&records, &Utc).len(), 5);
    }

    #[test]
    fn heatmap_keeps_most_recent_active_days() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let records: Vec<IncidentRecord> = (0..120)
            .map(|offset| {
                let day = start + chrono::Duration::days(offset * 2);
                let mut record = IncidentRecord::new(offset.to_string());
                record.created_at = day.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc());
                record
            })
            .collect();
        let heatmap = heatmap_last_90_days(&records, &Utc);
        assert_eq!(heatmap.len(), HEATMAP_DAYS);
        let last = start + chrono::Duration::days(119 * 2);
        assert_eq!(
            heatmap.last().unwrap().date,
            last.format("%Y-%m-%d").to_string()
        );
        let first = start + chrono::Duration::days(30 * 2);
        assert_eq!(heatmap[0].date, first.format("%Y-%m-%d").to_string());
    }
}
