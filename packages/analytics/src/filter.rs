//! Filter application and filter-choice discovery.

use std::collections::BTreeSet;

use chrono::TimeZone;
use tombo_report_models::{FilterCriteria, IncidentRecord};

/// Returns `true` if `record` satisfies every restriction in `criteria`.
///
/// Date bounds are whole local days in `tz`: `date_from` admits reports
/// from its first instant, `date_to` through its last. Once either bound
/// is set, records without a creation time no longer pass.
#[must_use]
pub fn passes<Tz: TimeZone>(record: &IncidentRecord, criteria: &FilterCriteria, tz: &Tz) -> bool {
    if !criteria
        .report_type
        .matches(record.report_type.as_deref())
    {
        return false;
    }

    if criteria.date_from.is_none() && criteria.date_to.is_none() {
        return true;
    }

    let Some(created) = record.created_at else {
        return false;
    };
    let day = created.with_timezone(tz).date_naive();

    criteria.date_from.is_none_or(|from| day >= from)
        && criteria.date_to.is_none_or(|to| day <= to)
}

/// Returns the records passing `criteria`, in input order.
#[must_use]
pub fn apply_filters<Tz: TimeZone>(
    records: &[IncidentRecord],
    criteria: &FilterCriteria,
    tz: &Tz,
) -> Vec<IncidentRecord> {
    if criteria.is_identity() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| passes(record, criteria, tz))
        .cloned()
        .collect()
}

/// Every report type present in `records`, for populating filter choices.
#[must_use]
pub fn distinct_types(records: &[IncidentRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|record| record.report_type.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, Utc};
    use tombo_report_models::TypeFilter;

    use super::*;
    use crate::fixtures::report;

    fn records() -> Vec<IncidentRecord> {
        vec![
            report("1", Some("theft"), Some("2024-01-01T00:00:00Z")),
            report("2", Some("robbery"), Some("2024-01-02T23:59:59.999Z")),
            report("3", Some("theft"), Some("2024-01-03T00:00:00Z")),
            report("4", None, Some("2024-01-02T12:00:00Z")),
            report("5", Some("theft"), None),
        ]
    }

    fn ids(records: &[IncidentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn identity_filter_returns_input() {
        let input = records();
        assert_eq!(apply_filters(&input, &FilterCriteria::default(), &Utc), input);
    }

    #[test]
    fn filters_by_exact_type() {
        let criteria = FilterCriteria {
            report_type: TypeFilter::from("theft"),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&apply_filters(&records(), &criteria, &Utc)), vec!["1", "3", "5"]);
    }

    #[test]
    fn date_bounds_cover_whole_days() {
        let criteria = FilterCriteria {
            report_type: TypeFilter::All,
            date_from: date(2024, 1, 2),
            date_to: date(2024, 1, 2),
        };
        assert_eq!(ids(&apply_filters(&records(), &criteria, &Utc)), vec!["2", "4"]);
    }

    #[test]
    fn open_ended_date_bounds() {
        let from_only = FilterCriteria {
            date_from: date(2024, 1, 2),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&apply_filters(&records(), &from_only, &Utc)), vec!["2", "3", "4"]);

        let to_only = FilterCriteria {
            date_to: date(2024, 1, 1),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&apply_filters(&records(), &to_only, &Utc)), vec!["1"]);
    }

    #[test]
    fn date_bounds_use_local_calendar() {
        // Midnight UTC on Jan 3 is still Jan 2 at UTC-5.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let criteria = FilterCriteria {
            date_to: date(2024, 1, 2),
            ..FilterCriteria::default()
        };
        assert_eq!(
            ids(&apply_filters(&records(), &criteria, &tz)),
            vec!["1", "2", "3", "4"]
        );
    }

    #[test]
    fn predicates_are_conjunctive() {
        let criteria = FilterCriteria {
            report_type: TypeFilter::from("theft"),
            date_from: date(2024, 1, 2),
            date_to: None,
        };
        assert_eq!(ids(&apply_filters(&records(), &criteria, &Utc)), vec!["3"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let criteria = FilterCriteria {
            report_type: TypeFilter::from("theft"),
            date_from: date(2024, 1, 1),
            date_to: date(2024, 1, 31),
        };
        let once = apply_filters(&records(), &criteria, &Utc);
        let twice = apply_filters(&once, &criteria, &Utc);
        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_types_skip_absent() {
        let types = distinct_types(&records());
        assert_eq!(
            types.into_iter().collect::<Vec<_>>(),
            vec!["robbery".to_string(), "theft".to_string()]
        );
    }
}
