//! Telemetry Store - In-memory per-device, per-metric time series
//!
//! Architecture:
//! - One append-only series per (device, metric) pair
//! - "Latest" means last appended, never max timestamp
//! - Bounded retention: a ring buffer of the most recent samples per series
//! - A running summary per series covers every sample ever appended, so the
//!   cumulative aggregate view is unaffected by eviction
//!
//! The poller is the only writer. Readers share the store through
//! [`SharedStore`]; a write lock is held only for the in-memory append.

use chrono::{DateTime, Utc};
use netpulse_common::{
    DeviceAggregate, Sample, METRIC_BANDWIDTH, METRIC_ERRORS, METRIC_LATENCY,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default retention per series: one hour at the default 1s poll interval
pub const DEFAULT_MAX_SAMPLES_PER_SERIES: usize = 3600;

// ============================================================================
// SERIES
// ============================================================================

/// Running statistics over every sample appended to a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesSummary {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Ordered samples for one (device, metric) pair
#[derive(Debug, Clone)]
pub struct MetricSeries {
    samples: VecDeque<Sample>,
    /// 0 means unbounded
    max_samples: usize,
    summary: Option<SeriesSummary>,
}

impl MetricSeries {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples,
            summary: None,
        }
    }

    /// Append a sample, evicting the oldest when retention is exceeded
    pub fn push(&mut self, sample: Sample) {
        match self.summary.as_mut() {
            Some(summary) => summary.observe(sample.value),
            None => self.summary = Some(SeriesSummary::first(sample.value)),
        }

        self.samples.push_back(sample);
        if self.max_samples > 0 && self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summary over all samples ever appended, including evicted ones
    pub fn summary(&self) -> Option<SeriesSummary> {
        self.summary
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Device -> metric -> series
#[derive(Debug)]
pub struct TelemetryStore {
    devices: HashMap<String, HashMap<String, MetricSeries>>,
    max_samples_per_series: usize,
}

impl TelemetryStore {
    /// Create an empty store with the given per-series retention (0 = unbounded)
    pub fn new(max_samples_per_series: usize) -> Self {
        Self {
            devices: HashMap::new(),
            max_samples_per_series,
        }
    }

    /// Append a sample to the end of the series for (device, metric).
    ///
    /// Creates the device and metric entries when absent. Always succeeds.
    pub fn append(&mut self, device: &str, metric: &str, timestamp: DateTime<Utc>, value: f64) {
        let max_samples = self.max_samples_per_series;
        self.devices
            .entry(device.to_string())
            .or_default()
            .entry(metric.to_string())
            .or_insert_with(|| MetricSeries::new(max_samples))
            .push(Sample::new(timestamp, value));
    }

    /// Make `device` known without appending any sample.
    ///
    /// A device whose every cell was rejected still shows up in the
    /// aggregate view, with zeros.
    pub fn register_device(&mut self, device: &str) {
        if !self.devices.contains_key(device) {
            self.devices.insert(device.to_string(), HashMap::new());
        }
    }

    /// Last appended sample for (device, metric), or None if unknown or empty
    pub fn latest(&self, device: &str, metric: &str) -> Option<Sample> {
        self.devices
            .get(device)
            .and_then(|metrics| metrics.get(metric))
            .and_then(|series| series.latest())
            .copied()
    }

    /// Latest sample of `metric` for every device that has one
    pub fn all_series(&self, metric: &str) -> Vec<(String, Sample)> {
        self.devices
            .iter()
            .filter_map(|(device, metrics)| {
                metrics
                    .get(metric)
                    .and_then(|series| series.latest())
                    .map(|sample| (device.clone(), *sample))
            })
            .collect()
    }

    /// Borrow a whole series
    pub fn series(&self, device: &str, metric: &str) -> Option<&MetricSeries> {
        self.devices.get(device).and_then(|metrics| metrics.get(metric))
    }

    /// Cumulative view per device: max latency, min bandwidth, total errors.
    ///
    /// Reads the running summaries, so freshness and retention are ignored.
    /// Every known device appears; missing metrics contribute 0.
    pub fn aggregate(&self) -> BTreeMap<String, DeviceAggregate> {
        self.devices
            .iter()
            .map(|(device, metrics)| {
                let summary = |name: &str| metrics.get(name).and_then(|s| s.summary());
                let aggregate = DeviceAggregate {
                    max_latency: summary(METRIC_LATENCY).map_or(0.0, |s| s.max),
                    min_bandwidth: summary(METRIC_BANDWIDTH).map_or(0.0, |s| s.min),
                    total_errors: summary(METRIC_ERRORS).map_or(0.0, |s| s.sum),
                };
                (device.clone(), aggregate)
            })
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn series_count(&self) -> usize {
        self.devices.values().map(|metrics| metrics.len()).sum()
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES_PER_SERIES)
    }
}

/// Thread-safe shared store handle
pub type SharedStore = Arc<RwLock<TelemetryStore>>;

pub fn create_shared_store(max_samples_per_series: usize) -> SharedStore {
    Arc::new(RwLock::new(TelemetryStore::new(max_samples_per_series)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_latest_on_empty_store() {
        let store = TelemetryStore::default();
        assert!(store.latest("switch1", "bandwidth").is_none());
        assert!(store.all_series("bandwidth").is_empty());
    }

    #[test]
    fn test_append_creates_entries() {
        let mut store = TelemetryStore::default();
        let now = Utc::now();
        store.append("switch1", "bandwidth", now, 42.0);

        assert_eq!(
            store.latest("switch1", "bandwidth"),
            Some(Sample::new(now, 42.0))
        );
        assert!(store.latest("switch1", "latency").is_none());
        assert!(store.latest("switch2", "bandwidth").is_none());
        assert_eq!(store.device_count(), 1);
        assert_eq!(store.series_count(), 1);
    }

    #[test]
    fn test_last_appended_wins_over_newer_timestamp() {
        let mut store = TelemetryStore::default();
        let t1 = Utc::now();
        let t2 = t1 - Duration::seconds(30);
        store.append("switch1", "latency", t1, 1.0);
        store.append("switch1", "latency", t2, 2.0);

        // t2 is older but was appended last
        assert_eq!(store.latest("switch1", "latency"), Some(Sample::new(t2, 2.0)));
    }

    #[test]
    fn test_all_series_only_includes_devices_with_metric() {
        let mut store = TelemetryStore::default();
        let now = Utc::now();
        store.append("switch1", "errors", now, 1.0);
        store.append("switch2", "errors", now, 2.0);
        store.append("switch2", "errors", now, 3.0);
        store.append("switch3", "latency", now, 0.5);

        let mut rows = store.all_series("errors");
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("switch1".to_string(), Sample::new(now, 1.0)));
        assert_eq!(rows[1], ("switch2".to_string(), Sample::new(now, 3.0)));
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let mut store = TelemetryStore::new(3);
        let now = Utc::now();
        for i in 0..5 {
            store.append("switch1", "bandwidth", now, i as f64);
        }

        let series = store.series("switch1", "bandwidth").unwrap();
        let values: Vec<f64> = series.samples().map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(series.latest().unwrap().value, 4.0);
    }

    #[test]
    fn test_registered_device_aggregates_to_zero() {
        let mut store = TelemetryStore::default();
        store.register_device("switch9");
        store.register_device("switch9");
        store.append("switch1", "errors", Utc::now(), 2.0);
        store.register_device("switch1");

        assert_eq!(store.device_count(), 2);
        assert_eq!(store.series_count(), 1);
        assert!(store.latest("switch9", "errors").is_none());

        let aggr = store.aggregate();
        assert_eq!(aggr["switch9"], DeviceAggregate::default());
        assert_eq!(aggr["switch1"].total_errors, 2.0);
    }

    #[test]
    fn test_unbounded_retention() {
        let mut series = MetricSeries::new(0);
        for i in 0..10_000 {
            series.push(Sample::new(Utc::now(), i as f64));
        }
        assert_eq!(series.len(), 10_000);
    }

    #[test]
    fn test_summary_survives_eviction() {
        let mut store = TelemetryStore::new(2);
        let now = Utc::now();
        for value in [5.0, 9.0, 1.0, 2.0] {
            store.append("switch1", "latency", now, value);
        }

        let summary = store.series("switch1", "latency").unwrap().summary().unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.sum, 17.0);
    }

    #[test]
    fn test_aggregate_defaults_to_zero() {
        let mut store = TelemetryStore::default();
        let now = Utc::now();
        store.append("switch1", "latency", now, 0.4);
        store.append("switch1", "latency", now, 0.9);
        store.append("switch1", "bandwidth", now, 80.0);
        store.append("switch1", "bandwidth", now, 20.0);
        store.append("switch1", "errors", now, 2.0);
        store.append("switch1", "errors", now, 3.0);
        store.append("switch2", "temperature", now, 40.0);

        let aggr = store.aggregate();
        assert_eq!(
            aggr["switch1"],
            DeviceAggregate {
                max_latency: 0.9,
                min_bandwidth: 20.0,
                total_errors: 5.0,
            }
        );
        assert_eq!(aggr["switch2"], DeviceAggregate::default());
    }
}
