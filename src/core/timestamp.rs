//! Timestamp parsing and chart coordinate conversion
//!
//! The backend emits ISO timestamps (`2024-05-01T13:00:00`), older pages
//! used `DD.MM.YYYY`. The chart works on plain `f64` seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a timestamp as delivered by the backend or typed by a user.
///
/// Returns `None` for anything that is not a valid calendar date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    // "DD.MM.YYYY HH:MM:SS.fff" as printed by the backend for ts_start/ts_end
    if let Some((date, _)) = raw.split_once(' ') {
        if let Ok(d) = NaiveDate::parse_from_str(date, "%d.%m.%Y") {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Chart x coordinate (seconds since epoch) for a timestamp
pub fn to_chart_x(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp_millis() as f64 / 1000.0
}

/// Inverse of [`to_chart_x`]
pub fn from_chart_x(x: f64) -> Option<NaiveDateTime> {
    if !x.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((x * 1000.0).round() as i64).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_variants() {
        let a = parse_timestamp("2024-05-01T13:45:00").unwrap();
        let b = parse_timestamp("2024-05-01 13:45:00.000").unwrap();
        let c = parse_timestamp("2024-05-01T13:45:00+00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_parse_dates() {
        let a = parse_timestamp("2024-05-01").unwrap();
        let b = parse_timestamp("01.05.2024").unwrap();
        let c = parse_timestamp("01.05.2024 10:11:12.000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-45").is_none());
    }

    #[test]
    fn test_chart_x_roundtrip() {
        let ts = parse_timestamp("2024-05-01T13:45:00").unwrap();
        assert_eq!(from_chart_x(to_chart_x(ts)), Some(ts));
        assert!(from_chart_x(f64::NAN).is_none());
    }
}
