//! Core data types shared by the daemon and the control client

use chrono::{DateTime, SecondsFormat, Utc};

/// Column carrying the device identifier in an upstream snapshot
pub const SWITCH_ID_COLUMN: &str = "switch_id";

/// Column carrying the sample instant in an upstream snapshot
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Well-known metric names used by the aggregate view
pub const METRIC_BANDWIDTH: &str = "bandwidth";
pub const METRIC_LATENCY: &str = "latency";
pub const METRIC_ERRORS: &str = "errors";

/// A single observation of one metric on one device.
///
/// Immutable once appended to a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Timestamp as it appears on the wire
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Query endpoints observed by latency instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    GetMetric,
    ListMetrics,
    Stats,
    AggregateMetrics,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Self::GetMetric,
        Self::ListMetrics,
        Self::Stats,
        Self::AggregateMetrics,
    ];

    /// Name used as the key in the stats latency table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetMetric => "get_metric",
            Self::ListMetrics => "list_metrics",
            Self::Stats => "stats",
            Self::AggregateMetrics => "aggregate_metrics",
        }
    }

    /// HTTP route serving this endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Self::GetMetric => "/telemetry/get",
            Self::ListMetrics => "/telemetry/list",
            Self::Stats => "/telemetry/stats",
            Self::AggregateMetrics => "/telemetry/aggregate",
        }
    }
}

/// Parse a timezone-aware ISO-8601 instant and normalize it to UTC.
///
/// Naive timestamps (no offset) are rejected.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC3339 with microsecond precision and a `Z` suffix
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offset_timestamp_normalizes_to_utc() {
        let ts = parse_timestamp("2025-06-01T14:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_python_isoformat() {
        // datetime.now(UTC).isoformat() output
        let ts = parse_timestamp("2025-06-01T12:00:00.123456+00:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2025-06-01T12:00:00.123456Z");
    }

    #[test]
    fn test_naive_and_garbage_timestamps_rejected() {
        assert!(parse_timestamp("2025-06-01T12:00:00").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_endpoint_names_are_stable() {
        let names: Vec<&str> = Endpoint::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(
            names,
            vec!["get_metric", "list_metrics", "stats", "aggregate_metrics"]
        );
        assert_eq!(Endpoint::Stats.path(), "/telemetry/stats");
    }
}
