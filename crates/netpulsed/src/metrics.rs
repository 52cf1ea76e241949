//! Prometheus metrics for the poller and query layer

use netpulse_common::Endpoint;
use prometheus::{
    register_histogram_vec_with_registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, Registry, TextEncoder,
};
use std::time::Duration;

/// Daemon metrics for Prometheus
#[derive(Clone)]
pub struct DaemonMetrics {
    // Poller
    pub polls_total: IntCounterVec,
    pub samples_ingested_total: IntCounter,
    pub rows_rejected_total: IntCounter,
    pub cells_rejected_total: IntCounter,
    pub poll_duration_seconds: Histogram,

    // Store
    pub devices: IntGauge,
    pub series: IntGauge,

    // Query layer
    pub query_duration_seconds: HistogramVec,

    registry: Registry,
}

impl DaemonMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let polls_total = register_int_counter_vec_with_registry!(
            "netpulse_polls_total",
            "Total number of upstream polls by result",
            &["result"],
            registry
        )?;

        let samples_ingested_total = register_int_counter_with_registry!(
            "netpulse_samples_ingested_total",
            "Total number of samples appended to the store",
            registry
        )?;

        let rows_rejected_total = register_int_counter_with_registry!(
            "netpulse_rows_rejected_total",
            "Total number of snapshot rows rejected by the parser",
            registry
        )?;

        let cells_rejected_total = register_int_counter_with_registry!(
            "netpulse_cells_rejected_total",
            "Total number of snapshot metric cells rejected by the parser",
            registry
        )?;

        let poll_duration_seconds = register_histogram_with_registry!(
            "netpulse_poll_duration_seconds",
            "Upstream fetch and ingest duration in seconds",
            vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0],
            registry
        )?;

        let devices = register_int_gauge_with_registry!(
            "netpulse_devices",
            "Number of devices known to the store",
            registry
        )?;

        let series = register_int_gauge_with_registry!(
            "netpulse_series",
            "Number of (device, metric) series in the store",
            registry
        )?;

        let query_duration_seconds = register_histogram_vec_with_registry!(
            "netpulse_query_duration_seconds",
            "Query handler duration in seconds by endpoint",
            &["endpoint"],
            vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1],
            registry
        )?;
        // Every endpoint is exported from startup, at zero
        for endpoint in Endpoint::ALL {
            query_duration_seconds.with_label_values(&[endpoint.as_str()]);
        }

        Ok(Self {
            polls_total,
            samples_ingested_total,
            rows_rejected_total,
            cells_rejected_total,
            poll_duration_seconds,
            devices,
            series,
            query_duration_seconds,
            registry,
        })
    }

    /// Record the outcome of one poll tick
    pub fn record_poll(&self, ok: bool, duration: Duration) {
        let result = if ok { "ok" } else { "error" };
        self.polls_total.with_label_values(&[result]).inc();
        self.poll_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Record what a snapshot contributed to the store
    pub fn record_ingest(&self, samples: usize, rejected_rows: usize, rejected_cells: usize) {
        self.samples_ingested_total.inc_by(samples as u64);
        self.rows_rejected_total.inc_by(rejected_rows as u64);
        self.cells_rejected_total.inc_by(rejected_cells as u64);
    }

    /// Update store size gauges
    pub fn update_store_size(&self, devices: usize, series: usize) {
        self.devices.set(devices as i64);
        self.series.set(series as i64);
    }

    pub fn record_query(&self, endpoint: Endpoint, duration: Duration) {
        self.query_duration_seconds
            .with_label_values(&[endpoint.as_str()])
            .observe(duration.as_secs_f64());
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_recorded_values() {
        let metrics = DaemonMetrics::new().unwrap();
        metrics.record_poll(true, Duration::from_millis(20));
        metrics.record_poll(false, Duration::from_millis(5));
        metrics.record_ingest(15, 1, 2);
        metrics.update_store_size(5, 15);
        metrics.record_query(Endpoint::GetMetric, Duration::from_micros(300));

        let text = metrics.export().unwrap();
        assert!(text.contains(r#"netpulse_polls_total{result="ok"} 1"#));
        assert!(text.contains(r#"netpulse_polls_total{result="error"} 1"#));
        assert!(text.contains("netpulse_samples_ingested_total 15"));
        assert!(text.contains("netpulse_rows_rejected_total 1"));
        assert!(text.contains("netpulse_cells_rejected_total 2"));
        assert!(text.contains("netpulse_series 15"));
        assert!(text.contains(r#"netpulse_query_duration_seconds_count{endpoint="get_metric"} 1"#));
        assert!(text.contains(r#"netpulse_query_duration_seconds_count{endpoint="stats"} 0"#));
    }

    #[test]
    fn test_registries_are_isolated() {
        // Each instance owns its registry, so two can coexist in one process
        let a = DaemonMetrics::new().unwrap();
        let b = DaemonMetrics::new().unwrap();
        a.record_ingest(3, 0, 0);
        assert!(b.export().unwrap().contains("netpulse_samples_ingested_total 0"));
    }
}
