/// Temporal normalizer.
///
/// Stored records carry timestamps in several legacy shapes: exported
/// store timestamps (`{"seconds": .., "nanoseconds": ..}`), tagged native
/// instants (`{"$date": ..}`), date strings and epoch-millisecond numbers.
/// [`RawTimestamp`] classifies a field into one of those shapes and
/// [`RawTimestamp::normalize`] turns it into a UTC instant. Text without an
/// offset is read in the zone the caller evaluates calendars in. Anything
/// that is not a valid calendar instant normalizes to `None`; nothing here
/// fails.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::store::Document;

/// Largest magnitude accepted for epoch milliseconds (±100,000,000 days).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Closed set of timestamp shapes found in stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Store-native timestamp object convertible to a date.
    Convertible { seconds: i64, nanos: u32 },
    /// Already an instant.
    Native(DateTime<Utc>),
    /// Free-form date text.
    Text(String),
    /// Milliseconds since the Unix epoch.
    NumericEpoch(f64),
    /// Null, missing, or an object with no conversion.
    Other,
}

impl RawTimestamp {
    /// Classify a JSON field value.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::Other;
        };

        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => n.as_f64().map_or(Self::Other, Self::NumericEpoch),
            Value::Object(map) => {
                if let Some(inner) = map.get("$date") {
                    return match Self::from_value(Some(inner)).normalize(&Utc) {
                        Some(instant) => Self::Native(instant),
                        None => Self::Other,
                    };
                }

                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64);
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);

                match seconds {
                    Some(seconds) => Self::Convertible {
                        seconds,
                        nanos: u32::try_from(nanos).unwrap_or(0),
                    },
                    None => Self::Other,
                }
            }
            _ => Self::Other,
        }
    }

    /// Classify a named field of a document.
    pub fn from_field(doc: &Document, field: &str) -> Self {
        Self::from_value(doc.get(field))
    }

    /// Convert to a canonical instant, or `None` when there is no valid one.
    ///
    /// Naive date-time text is read as wall time in `tz`.
    pub fn normalize<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        match self {
            Self::Convertible { seconds, nanos } => DateTime::from_timestamp(*seconds, *nanos),
            Self::Native(instant) => Some(*instant),
            Self::Text(text) => parse_text(text, tz),
            Self::NumericEpoch(millis) => from_epoch_millis(*millis),
            Self::Other => None,
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Native(instant)
    }
}

/// Normalize a document field in one step.
pub fn normalize_field<Tz: TimeZone>(doc: &Document, field: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    RawTimestamp::from_field(doc, field).normalize(tz)
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

/// Parse date text the way a browser date parser accepts the common forms.
///
/// Offset-bearing forms keep their offset, date-only forms are UTC midnight,
/// and naive date-times are wall time in `tz`.
fn parse_text<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
