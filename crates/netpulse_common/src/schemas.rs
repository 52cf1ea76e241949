//! JSON payloads served by netpulsed and consumed by netpulsectl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ERR_METRIC_NOT_FOUND: &str = "Metric not found";
pub const ERR_STALE: &str = "Telemetry data is stale or missing";
pub const ERR_NO_FRESH_DATA: &str = "No fresh telemetry data found";

/// Error payload returned with every non-2xx query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// `GET /telemetry/get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResponse {
    pub switch_id: String,
    pub metric: String,
    pub value: f64,
    pub timestamp: String,
}

/// One device's entry in `GET /telemetry/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub value: f64,
    pub timestamp: String,
}

/// `GET /telemetry/list`: device -> latest fresh reading
pub type ListResponse = BTreeMap<String, MetricReading>;

/// Latency summary for one endpoint, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EndpointLatency {
    pub avg_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
}

/// The `latency` object of the stats payload.
///
/// Endpoint entries and `uptime_seconds` share one JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyReport {
    #[serde(flatten)]
    pub endpoints: BTreeMap<String, EndpointLatency>,
    pub uptime_seconds: f64,
}

/// `GET /telemetry/stats`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests: u64,
    pub errors: u64,
    pub latency: LatencyReport,
}

/// Cumulative per-device view over all samples ever ingested
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceAggregate {
    pub max_latency: f64,
    pub min_bandwidth: f64,
    pub total_errors: f64,
}

/// `GET /telemetry/aggregate`
pub type AggregateResponse = BTreeMap<String, DeviceAggregate>;

/// Poller counters reported by `GET /health`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollerReport {
    pub ticks: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub samples_ingested: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub poller: PollerReport,
    pub devices: usize,
    pub series: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_payload_shape() {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "get_metric".to_string(),
            EndpointLatency {
                avg_latency: 0.5,
                min_latency: 0.25,
                max_latency: 0.75,
            },
        );
        let stats = StatsResponse {
            requests: 3,
            errors: 1,
            latency: LatencyReport {
                endpoints,
                uptime_seconds: 12.0,
            },
        };

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            value,
            json!({
                "requests": 3,
                "errors": 1,
                "latency": {
                    "get_metric": {"avg_latency": 0.5, "min_latency": 0.25, "max_latency": 0.75},
                    "uptime_seconds": 12.0
                }
            })
        );

        let back: StatsResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_error_payload() {
        let body = serde_json::to_string(&ErrorResponse::new(ERR_METRIC_NOT_FOUND)).unwrap();
        assert_eq!(body, r#"{"error":"Metric not found"}"#);
    }
}
