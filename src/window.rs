/// Time-window filtering
///
/// Parses window names ('today', 'week', 'month', 'year', 'all') into a
/// closed enumeration and evaluates whether an instant falls inside the
/// window relative to "now". Calendar fields are compared in the timezone
/// of `now`, so callers control local-time semantics through their clock.
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named relative time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Same calendar day as now
    Today,
    /// Sunday-to-Saturday week containing now
    Week,
    /// Same calendar month as now
    Month,
    /// Same calendar year as now
    Year,
    /// No restriction
    #[default]
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::Today,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::Year,
        TimeWindow::All,
    ];

    /// Parse a window name
    ///
    /// `day` is accepted as an alias for `today`. Any unrecognized name falls
    /// back to [`TimeWindow::All`] so that newer callers never break older
    /// engines; the fallback is logged.
    pub fn parse(window: &str) -> Self {
        match window.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Self::Today,
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            "all" | "alltime" | "all-time" => Self::All,
            other => {
                tracing::warn!(window = %other, "Unknown time window, using all-time");
                Self::All
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }

    /// Human label used in rendered reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "This Week",
            Self::Month => "This Month",
            Self::Year => "This Year",
            Self::All => "All Time",
        }
    }

    /// Check whether `instant` lies inside this window relative to `now`
    pub fn contains<Tz: TimeZone>(&self, now: &DateTime<Tz>, instant: &DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&now.timezone());
        match self {
            Self::Today => {
                local.year() == now.year() && local.month() == now.month() && local.day() == now.day()
            }
            Self::Week => {
                let (start, end) = week_bounds(now.date_naive());
                let at = local.naive_local();
                start <= at && at <= end
            }
            Self::Month => local.year() == now.year() && local.month() == now.month(),
            Self::Year => local.year() == now.year(),
            Self::All => true,
        }
    }

    /// Predicate over instants, fixed to one `now`
    pub fn predicate<Tz: TimeZone>(self, now: DateTime<Tz>) -> impl Fn(&DateTime<Utc>) -> bool {
        move |instant| self.contains(&now, instant)
    }
}

impl FromStr for TimeWindow {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sunday-to-Saturday bounds of the week containing `day`
///
/// Returns (start, end) where start is Sunday 00:00:00.000 and end is
/// Saturday 23:59:59.999, both in the local time of the caller.
pub fn week_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    let sunday = day.checked_sub_days(Days::new(offset)).unwrap_or(day);
    let saturday = day.checked_add_days(Days::new(6 - offset)).unwrap_or(day);

    let start = sunday.and_time(chrono::NaiveTime::MIN);
    let end = saturday
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| saturday.and_time(chrono::NaiveTime::MIN));
    (start, end)
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => u32::try_from((next - first).num_days()).unwrap_or(31),
        _ => 31,
    }
}

/// Source of "now" for window evaluation
pub trait Clock: Send + Sync {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the machine's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to one instant, used for reproducible reports and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<chrono::FixedOffset>);

impl Clock for FixedClock {
    type Tz = chrono::FixedOffset;

    fn now(&self) -> DateTime<chrono::FixedOffset> {
        self.0
    }
}
