//! Time and duration literals shared by the config layer and the commands.
//!
//! Durations use the Prometheus unit syntax (`30s`, `1m30s`, `2h`, `500ms`);
//! a bare number is read as seconds. Time values follow the query-time rules:
//! empty, `now`, RFC3339, then Unix epoch seconds.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid time format: {0} (use RFC3339, a Unix timestamp, or 'now')")]
    InvalidTime(String),

    #[error("invalid duration: {input}: {reason}")]
    InvalidDuration { input: String, reason: String },
}

/// Parse a query time value.
///
/// Returns `Ok(None)` for the empty string, which callers treat as "unset"
/// (no time parameter is sent to the server).
pub fn parse_time(input: &str) -> Result<Option<DateTime<Utc>>, TimeError> {
    if input.is_empty() {
        return Ok(None);
    }
    if input == "now" {
        return Ok(Some(Utc::now()));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    if let Ok(secs) = input.parse::<i64>() {
        if let Some(ts) = Utc.timestamp_opt(secs, 0).single() {
            return Ok(Some(ts));
        }
    }
    Err(TimeError::InvalidTime(input.to_string()))
}

/// Parse a duration: a bare number of seconds (`30`, `1.5`) or a
/// Prometheus duration (`15s`, `1m30s`, `2h`, `1d`, `250ms`).
pub fn parse_duration(input: &str) -> Result<Duration, TimeError> {
    let s = input.trim();
    let invalid = |reason: String| TimeError::InvalidDuration { input: input.to_string(), reason };

    if s.is_empty() {
        return Err(invalid("empty duration string".to_string()));
    }
    if let Ok(secs) = s.parse::<f64>() {
        if secs < 0.0 {
            return Err(invalid(format!("negative value {secs}")));
        }
        return Duration::try_from_secs_f64(secs).map_err(|err| invalid(err.to_string()));
    }
    promql_parser::util::parse_duration(s).map_err(invalid)
}

/// Render a duration in the syntax accepted by [`parse_duration`], at
/// millisecond precision.
pub fn format_duration(d: Duration) -> String {
    if d.as_millis() == 0 {
        return "0s".to_string();
    }
    promql_parser::util::display_duration(&d)
}

/// Serialize a timestamp the way the query API expects it: Unix seconds
/// with millisecond precision.
pub fn format_unix_seconds(ts: &DateTime<Utc>) -> String {
    format!("{:.3}", ts.timestamp_millis() as f64 / 1000.0)
}

/// `#[serde(with = "...")]` helper storing a [`Duration`] as its string form.
pub mod serde_duration {
    use super::{format_duration, parse_duration};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Seconds(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => parse_duration(&text).map_err(de::Error::custom),
            Raw::Seconds(secs) => Duration::try_from_secs_f64(secs).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_empty_is_unset() {
        assert_eq!(parse_time("").unwrap(), None);
    }

    #[test]
    fn test_parse_time_now_is_current_instant() {
        let before = Utc::now();
        let parsed = parse_time("now").unwrap().expect("now is set");
        let after = Utc::now();
        assert!(parsed >= before && parsed <= after);
    }

    #[test]
    fn test_parse_time_rfc3339_and_epoch_agree() {
        let rfc = parse_time("2024-01-01T00:00:00Z").unwrap().unwrap();
        let epoch = parse_time("1704067200").unwrap().unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(rfc, epoch);
    }

    #[test]
    fn test_parse_time_rfc3339_with_offset() {
        let ts = parse_time("2024-01-01T08:00:00+08:00").unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_parse_time_garbage_names_input() {
        let err = parse_time("garbage").unwrap_err();
        assert_eq!(err, TimeError::InvalidTime("garbage".to_string()));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_parse_time_rejects_trailing_junk_after_digits() {
        assert!(parse_time("1704067200abc").is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m30s250ms").unwrap(), Duration::from_millis(90_250));
    }

    #[test]
    fn test_parse_duration_rejects_invalid() {
        for input in ["", "s", "15x", "-5s", "-5", "1h30", "1.2.3s"] {
            assert!(parse_duration(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn test_format_duration_is_parseable() {
        for d in [
            Duration::ZERO,
            Duration::from_secs(30),
            Duration::from_secs(3725),
            Duration::from_millis(1500),
            Duration::from_secs(86_400 + 90),
        ] {
            let text = format_duration(d);
            assert_eq!(parse_duration(&text).unwrap(), d, "round trip of {text}");
        }
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
    }

    #[test]
    fn test_format_unix_seconds_keeps_millis() {
        let ts = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();
        assert_eq!(format_unix_seconds(&ts), "1704067200.123");
    }
}
