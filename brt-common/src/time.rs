//! Timestamp utilities
//!
//! Observation times are kept at microsecond precision so that a value
//! written to the database reads back identical.

use chrono::{DateTime, SubsecRound, Utc};

/// Get current UTC timestamp, truncated to microseconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Convert a timestamp to UNIX microseconds (storage representation)
pub fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// Convert UNIX microseconds back to a timestamp
///
/// Returns `None` for values outside chrono's representable range.
pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// Convert seconds to duration
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_now_has_no_sub_microsecond_part() {
        let timestamp = now();
        assert_eq!(timestamp.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_micros_round_trip_is_exact() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 10).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(from_micros(to_micros(ts)), Some(ts));
    }

    #[test]
    fn test_now_survives_storage_conversion() {
        let ts = now();
        assert_eq!(from_micros(to_micros(ts)), Some(ts));
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(0), Duration::ZERO);
        assert_eq!(secs_to_duration(3600), Duration::from_secs(3600));
    }
}
