//! Lenient timestamp parsing for heterogeneous log exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Naive formats tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a timestamp string into a naive (wall-clock) datetime.
///
/// Offset-carrying values are converted to UTC and the offset dropped.
/// Returns `None` for empty or unrecognised input.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_common_formats() {
        let iso = parse_timestamp("2024-03-01 10:15:30").unwrap();
        assert_eq!((iso.hour(), iso.minute(), iso.second()), (10, 15, 30));

        let t_sep = parse_timestamp("2024-03-01T10:15:30.250").unwrap();
        assert_eq!(t_sep.minute(), 15);

        let rfc = parse_timestamp("2024-03-01T10:15:30+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let us = parse_timestamp("03/01/2024 01:05:00 PM").unwrap();
        assert_eq!((us.month(), us.day(), us.hour()), (3, 1, 13));

        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.hour(), 0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-45 99:99:99").is_none());
    }
}
