//! Shared utility functions.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ReportError, Result};

/// Storage format for timestamps in the row store (UTC).
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a raw timestamp from the row store.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (interpreted as UTC), the same with
/// fractional seconds, and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, DB_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| ReportError::parse("Invalid timestamp", raw))
}

/// Formats a timestamp the way the row store stores it.
pub fn format_db_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Rounds to the given number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// `sum / count`, or 0 when `count` is zero.
pub fn average(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Truncates to at most `max_chars` characters (not bytes).
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => input[..byte_index].to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15 08:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15 08:30:00.000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T08:30:00Z").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("last tuesday").unwrap_err();
        assert!(matches!(err, ReportError::Parse { .. }));
    }

    #[test]
    fn test_format_db_timestamp() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_db_timestamp(timestamp), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_zero_guards() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(average(120.0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(average(300.0, 3), 100.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.34, 1), 0.3);
        assert_eq!(round_to(33.3333, 1), 33.3);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("billing-and-invoices", 18), "billing-and-invoic");
        assert_eq!(truncate_chars("short", 18), "short");
        assert_eq!(truncate_chars("äöüäöüäöüäöüäöüäöüäöü", 3), "äöü");
    }
}
