//! Timestamp coercion for stored rows.
//!
//! Rows are written with an RFC 3339 UTC string. Readers also accept what
//! other producers commonly write into the same lists: RFC 3339 with any
//! offset, naive date-times (taken as UTC), bare dates, and JSON numbers
//! holding epoch milliseconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::StoreError;

/// Name of the field every row carries
pub const TIMESTAMP_FIELD: &str = "timestamp";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Canonical wire form of a timestamp
pub fn encode(ts: &DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Coerce a stored `timestamp` value to UTC
pub fn coerce(value: &Value) -> Result<DateTime<Utc>, StoreError> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                    StoreError::Decode(format!("Epoch milliseconds out of range: {}", ms))
                })
            } else {
                let ms = n.as_f64().unwrap_or(f64::NAN);
                let out_of_range =
                    || StoreError::Decode(format!("Epoch milliseconds out of range: {}", n));
                if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
                    return Err(out_of_range());
                }
                // Split so the fraction keeps full precision at large magnitudes
                let whole = ms.trunc();
                let frac_nanos = ((ms - whole) * 1_000_000.0).round() as i64;
                DateTime::from_timestamp_millis(whole as i64)
                    .and_then(|ts| ts.checked_add_signed(chrono::Duration::nanoseconds(frac_nanos)))
                    .ok_or_else(out_of_range)
            }
        }
        other => Err(StoreError::Decode(format!(
            "Unsupported timestamp value: {}",
            other
        ))),
    }
}

fn parse_str(s: &str) -> Result<DateTime<Utc>, StoreError> {
    let s = s.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(StoreError::Decode(format!("Unparseable timestamp: '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_encode_is_rfc3339_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(encode(&ts), json!("2024-03-01T09:30:00Z"));

        let ts = ts + chrono::Duration::milliseconds(250);
        assert_eq!(encode(&ts), json!("2024-03-01T09:30:00.250Z"));
    }

    #[test]
    fn test_encode_coerce_round_trip_keeps_nanos() {
        let ts = DateTime::from_timestamp_nanos(1_709_285_400_123_456_789);
        assert_eq!(coerce(&encode(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_coerce_offsets_to_utc() {
        let ts = coerce(&json!("2024-03-01T04:30:00-05:00")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_coerce_naive_and_date_strings() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(coerce(&json!("2024-03-01 09:30:00")).unwrap(), expected);
        assert_eq!(coerce(&json!("2024-03-01T09:30:00")).unwrap(), expected);

        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(coerce(&json!("2024-03-01")).unwrap(), midnight);
    }

    #[test]
    fn test_coerce_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(coerce(&json!(1_709_285_400_000_i64)).unwrap(), expected);

        let fractional = coerce(&json!(1_709_285_400_000.5)).unwrap();
        assert_eq!(fractional, expected + chrono::Duration::microseconds(500));
    }

    #[test]
    fn test_coerce_rejects_garbage() {
        assert!(matches!(coerce(&json!("yesterday")), Err(StoreError::Decode(_))));
        assert!(matches!(coerce(&json!(true)), Err(StoreError::Decode(_))));
        assert!(matches!(coerce(&Value::Null), Err(StoreError::Decode(_))));
        assert!(matches!(coerce(&json!(1e300)), Err(StoreError::Decode(_))));
    }
}
