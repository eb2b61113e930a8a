//! Time utility functions

use chrono::{DateTime, Utc};

/// Convert epoch milliseconds (possibly fractional) to integer nanoseconds
///
/// Whole and fractional milliseconds are scaled separately so epoch-sized
/// values keep sub-millisecond precision. Non-finite input maps to 0.
pub fn millis_to_nanos(millis: f64) -> i64 {
    if !millis.is_finite() {
        return 0;
    }
    let whole = millis.trunc();
    let frac = millis - whole;
    (whole as i64)
        .saturating_mul(1_000_000)
        .saturating_add((frac * 1_000_000.0).round() as i64)
}

/// Convert nanoseconds since Unix epoch to DateTime<Utc>
pub fn nanos_to_datetime(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_millis_to_nanos_whole() {
        assert_eq!(millis_to_nanos(100.0), 100_000_000);
    }

    #[test]
    fn test_millis_to_nanos_fractional_rounds() {
        assert_eq!(millis_to_nanos(123.456), 123_456_000);
        assert_eq!(millis_to_nanos(0.25), 250_000);
        assert_eq!(millis_to_nanos(1_700_000_000_123.5), 1_700_000_000_123_500_000);
    }

    #[test]
    fn test_millis_to_nanos_non_finite() {
        assert_eq!(millis_to_nanos(f64::NAN), 0);
        assert_eq!(millis_to_nanos(f64::INFINITY), 0);
    }

    #[test]
    fn test_nanos_to_datetime_epoch() {
        let dt = nanos_to_datetime(0);
        assert_eq!(dt.year(), 1970);
        assert_eq!(dt, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_nanos_to_datetime_known_value() {
        let dt = nanos_to_datetime(1_704_067_200_000_000_000);
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }
}
