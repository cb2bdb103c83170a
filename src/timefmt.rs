use chrono::{DateTime, TimeZone, Utc};

/// Format an instant as a UTC string.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a zoned date-time with its UTC offset, e.g. for report headers.
pub fn format_zoned<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.fixed_offset().format("%Y-%m-%d %H:%M:%S %:z").to_string()
}
