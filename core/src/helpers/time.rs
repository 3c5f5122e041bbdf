use chrono::{DateTime, NaiveDateTime, Utc};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Renders epoch milliseconds the way ClickHouse expects a `DateTime64(3)`
/// literal: `YYYY-MM-DD HH:MM:SS.sss` in UTC.
pub fn millis_to_datetime(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => "1970-01-01 00:00:00.000".to_string(),
    }
}

/// Parses a `DateTime64(3)` value read back from ClickHouse. Unparseable or
/// missing values normalize to epoch zero.
pub fn datetime_to_millis(value: &str) -> i64 {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}
