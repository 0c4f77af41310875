mod naming;

pub use naming::{camel_name, snake_name, split_words};

use chrono::{DateTime, Utc};

/// Lowest version a migration may carry; also the "nothing applied" sentinel.
pub const MIN_VERSION: i64 = 0;

/// Highest version a migration may carry.
pub const MAX_VERSION: i64 = i64::MAX;

/// `chrono` format for timestamp identifiers (`YYYYMMDDHHMMSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Versions at or above this are treated as timestamp identifiers by `fix`.
pub const TIMESTAMP_VERSION_THRESHOLD: i64 = 10_000_000_000_000;

/// Width of sequential identifiers (`00001`).
pub const SEQUENTIAL_WIDTH: usize = 5;

/// Format a sequential identifier, left-padded with zeros.
pub fn sequential_version(version: i64) -> String {
    format!("{:0width$}", version, width = SEQUENTIAL_WIDTH)
}

/// Format a timestamp identifier.
pub fn timestamp_version(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sequential_version() {
        assert_eq!(sequential_version(1), "00001");
        assert_eq!(sequential_version(42), "00042");
        assert_eq!(sequential_version(123456), "123456");
    }

    #[test]
    fn test_timestamp_version() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let version = timestamp_version(at);
        assert_eq!(version, "20240309070501");
        assert!(version.parse::<i64>().unwrap() >= TIMESTAMP_VERSION_THRESHOLD);
    }
}
