/// Bucketing aggregators.
///
/// Groups normalized instants into fixed-cardinality buckets (hours of
/// today, weekdays of this week, days of this month, months of a year) or
/// dynamic year buckets. Fixed shapes always enumerate every bucket, so a
/// series for an empty collection is a full row of zeros.
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::{Collection, Document};
use crate::timestamp::normalize_field;
use crate::window::{days_in_month, TimeWindow};

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One bucket of a count series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: u64,
}

/// Bucket shape of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// 24 hour buckets over the current day
    HourOfDay,
    /// 7 weekday buckets (Sunday first) over the current week
    DayOfWeek,
    /// One bucket per day of the current month
    DayOfMonth,
    /// 12 month buckets over the given year
    MonthOfYear(i32),
    /// One bucket per calendar year present, ascending
    Year,
}

impl Granularity {
    /// Window an instant must fall in to be counted, relative to now.
    fn window(&self) -> TimeWindow {
        match self {
            Self::HourOfDay => TimeWindow::Today,
            Self::DayOfWeek => TimeWindow::Week,
            Self::DayOfMonth => TimeWindow::Month,
            Self::MonthOfYear(_) | Self::Year => TimeWindow::All,
        }
    }
}

/// Which collection and timestamp field a series is computed over.
///
/// Poems and users share the bucketing algorithm and differ only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySource {
    Poems,
    Users,
}

impl EntitySource {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Poems => Collection::Poems,
            Self::Users => Collection::Users,
        }
    }

    pub fn timestamp_field(&self) -> &'static str {
        match self {
            Self::Poems => "datePosted",
            Self::Users => "createdAt",
        }
    }

    /// Normalized instants of every document that has a valid timestamp.
    ///
    /// Naive timestamps are read as wall time in `tz`.
    pub fn instants<Tz: TimeZone>(&self, docs: &[Document], tz: &Tz) -> Vec<DateTime<Utc>> {
        let field = self.timestamp_field();
        docs.iter()
            .filter_map(|doc| {
                let instant = normalize_field(doc, field, tz);
                if instant.is_none() {
                    tracing::debug!(id = %doc.id, field, "Skipping document without a valid timestamp");
                }
                instant
            })
            .collect()
    }
}

/// Count instants per bucket of `granularity`, relative to `now`.
pub fn bucket_series<Tz: TimeZone>(
    instants: &[DateTime<Utc>],
    granularity: Granularity,
    now: &DateTime<Tz>,
) -> Vec<SeriesPoint> {
    let size = match granularity {
        Granularity::HourOfDay => 24,
        Granularity::DayOfWeek => 7,
        Granularity::DayOfMonth => days_in_month(now.year(), now.month()) as usize,
        Granularity::MonthOfYear(_) => 12,
        Granularity::Year => return year_series(instants, &now.timezone()),
    };
    let mut counts = vec![0u64; size];

    let window = granularity.window();
    for instant in instants {
        if !window.contains(now, instant) {
            continue;
        }
        let local = instant.with_timezone(&now.timezone());
        let index = match granularity {
            Granularity::HourOfDay => Some(local.hour()),
            Granularity::DayOfWeek => Some(local.weekday().num_days_from_sunday()),
            Granularity::DayOfMonth => Some(local.day0()),
            Granularity::MonthOfYear(year) => (local.year() == year).then(|| local.month0()),
            Granularity::Year => None,
        };
        if let Some(slot) = index.and_then(|i| counts.get_mut(i as usize)) {
            *slot += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, value)| SeriesPoint {
            label: bucket_label(granularity, i),
            value,
        })
        .collect()
}

fn bucket_label(granularity: Granularity, index: usize) -> String {
    match granularity {
        Granularity::HourOfDay => index.to_string(),
        Granularity::DayOfWeek => WEEKDAY_LABELS[index % 7].to_string(),
        Granularity::DayOfMonth | Granularity::MonthOfYear(_) => (index + 1).to_string(),
        Granularity::Year => index.to_string(),
    }
}

/// Count per calendar year, sorted by numeric year.
fn year_series<Tz: TimeZone>(instants: &[DateTime<Utc>], tz: &Tz) -> Vec<SeriesPoint> {
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    for instant in instants {
        *by_year.entry(instant.with_timezone(tz).year()).or_insert(0) += 1;
    }
    by_year
        .into_iter()
        .map(|(year, value)| SeriesPoint {
            label: year.to_string(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // Wednesday 2025-03-12 15:30 UTC
    fn now() -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2025, 3, 12, 15, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn total(series: &[SeriesPoint]) -> u64 {
        series.iter().map(|p| p.value).sum()
    }

    #[test]
    fn test_fixed_shapes_are_complete_when_empty() {
        assert_eq!(bucket_series(&[], Granularity::HourOfDay, &now()).len(), 24);
        assert_eq!(bucket_series(&[], Granularity::DayOfWeek, &now()).len(), 7);
        assert_eq!(bucket_series(&[], Granularity::DayOfMonth, &now()).len(), 31);
        assert_eq!(bucket_series(&[], Granularity::MonthOfYear(2025), &now()).len(), 12);
        assert!(bucket_series(&[], Granularity::Year, &now()).is_empty());

        for g in [Granularity::HourOfDay, Granularity::DayOfWeek, Granularity::DayOfMonth] {
            assert_eq!(total(&bucket_series(&[], g, &now())), 0);
        }
    }

    #[test]
    fn test_hour_of_day_counts_only_today() {
        let instants = [at(2025, 3, 12, 10), at(2025, 3, 12, 10), at(2025, 3, 11, 10), at(2025, 3, 12, 23)];
        let series = bucket_series(&instants, Granularity::HourOfDay, &now());

        assert_eq!(series[10].value, 2);
        assert_eq!(series[23].value, 1);
        assert_eq!(series[10].label, "10");
        assert_eq!(total(&series), 3);
    }

    #[test]
    fn test_day_of_week_counts_current_week() {
        let instants = [
            at(2025, 3, 9, 0),  // Sunday, same week
            at(2025, 3, 12, 9), // Wednesday
            at(2025, 3, 15, 23), // Saturday
            at(2025, 3, 8, 12), // previous Saturday
        ];
        let series = bucket_series(&instants, Granularity::DayOfWeek, &now());

        assert_eq!(series[0].label, "Sun");
        assert_eq!(series[0].value, 1);
        assert_eq!(series[3].value, 1);
        assert_eq!(series[6].value, 1);
        assert_eq!(total(&series), 3);
    }

    #[test]
    fn test_day_of_month_sized_by_current_month() {
        let feb_now = tz().with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap();
        let instants = [at(2024, 2, 1, 0), at(2024, 2, 29, 5), at(2024, 3, 1, 0)];
        let series = bucket_series(&instants, Granularity::DayOfMonth, &feb_now);

        assert_eq!(series.len(), 29);
        assert_eq!(series[0].label, "1");
        assert_eq!(series[0].value, 1);
        assert_eq!(series[28].label, "29");
        assert_eq!(series[28].value, 1);
        assert_eq!(total(&series), 2);
    }

    #[test]
    fn test_month_of_year_filters_by_year_parameter() {
        let instants = [at(2023, 1, 5, 0), at(2023, 12, 31, 10), at(2024, 1, 5, 0)];
        let series = bucket_series(&instants, Granularity::MonthOfYear(2023), &now());

        assert_eq!(series[0].label, "1");
        assert_eq!(series[0].value, 1);
        assert_eq!(series[11].label, "12");
        assert_eq!(series[11].value, 1);
        assert_eq!(total(&series), 2);
    }

    #[test]
    fn test_year_series_sorted_numerically() {
        let instants = [at(2022, 1, 1, 5), at(2023, 6, 1, 0), at(2022, 8, 1, 0), at(999, 1, 1, 0)];
        let series = bucket_series(&instants, Granularity::Year, &now());

        let labels: Vec<_> = series.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["999", "2022", "2023"]);
        assert_eq!(series[1].value, 2);
        assert_eq!(series[2].value, 1);
    }

    #[test]
    fn test_entity_source_skips_malformed_timestamps() {
        let docs: Vec<Document> = [
            json!({"id": "p1", "datePosted": "2025-03-12T10:00:00Z"}),
            json!({"id": "p2", "datePosted": "not-a-date"}),
            json!({"id": "p3"}),
            json!({"id": "u1", "createdAt": 1741773600000_i64}),
        ]
        .into_iter()
        .map(|v| Document::from_value(v, String::new()))
        .collect();

        assert_eq!(EntitySource::Poems.instants(&docs, &Utc).len(), 1);
        assert_eq!(EntitySource::Users.instants(&docs, &Utc).len(), 1);
        assert_eq!(EntitySource::Users.collection(), Collection::Users);
    }
}
