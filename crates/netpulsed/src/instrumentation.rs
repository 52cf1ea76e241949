//! Latency instrumentation and service counters for the query layer
//!
//! Every query operation runs inside [`Instrumentation::observe`]. Timing is
//! recorded by a drop guard, so the sample is taken on every exit path:
//! normal return, error return, panic unwind, or the request future being
//! dropped mid-flight.

use crate::metrics::DaemonMetrics;
use netpulse_common::{Endpoint, EndpointLatency, LatencyReport, StatsResponse};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Running count/sum/min/max for one endpoint, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub total: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl LatencyStats {
    pub fn record(&mut self, seconds: f64) {
        self.count += 1;
        self.total += seconds;
        self.min = Some(self.min.map_or(seconds, |m| m.min(seconds)));
        self.max = Some(self.max.map_or(seconds, |m| m.max(seconds)));
    }

    /// Average 0 when nothing was recorded; unset min/max report as 0
    pub fn summary(&self) -> EndpointLatency {
        EndpointLatency {
            avg_latency: if self.count > 0 {
                self.total / self.count as f64
            } else {
                0.0
            },
            min_latency: self.min.unwrap_or(0.0),
            max_latency: self.max.unwrap_or(0.0),
        }
    }
}

/// Per-endpoint latency table plus process-wide request/error counters
pub struct Instrumentation {
    latency: Mutex<HashMap<Endpoint, LatencyStats>>,
    requests: AtomicU64,
    errors: AtomicU64,
    started_at: Instant,
    metrics: Option<Arc<DaemonMetrics>>,
}

impl Instrumentation {
    pub fn new() -> Self {
        Self {
            latency: Mutex::new(HashMap::new()),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: Instant::now(),
            metrics: None,
        }
    }

    /// Also feed query durations into the Prometheus histogram
    pub fn new_with_metrics(metrics: Arc<DaemonMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new()
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Fold one observed duration into the endpoint's statistics
    pub fn record_latency(&self, endpoint: Endpoint, duration: Duration) {
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint)
            .or_default()
            .record(duration.as_secs_f64());

        if let Some(ref metrics) = self.metrics {
            metrics.record_query(endpoint, duration);
        }
    }

    /// Raw statistics for one endpoint, if it was ever observed
    pub fn latency_for(&self, endpoint: Endpoint) -> Option<LatencyStats> {
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint)
            .copied()
    }

    /// Start timing a call; the guard records when dropped
    pub fn start(&self, endpoint: Endpoint) -> LatencyGuard<'_> {
        LatencyGuard {
            instrumentation: self,
            endpoint,
            started: Instant::now(),
        }
    }

    /// Run `op` as `endpoint`, recording its wall-clock duration
    pub async fn observe<F, Fut, T>(&self, endpoint: Endpoint, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.start(endpoint);
        op().await
    }

    /// Stats payload: counters, per-endpoint latency and uptime
    pub fn stats(&self) -> StatsResponse {
        let endpoints = self
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(endpoint, stats)| (endpoint.as_str().to_string(), stats.summary()))
            .collect();

        StatsResponse {
            requests: self.requests(),
            errors: self.errors(),
            latency: LatencyReport {
                endpoints,
                uptime_seconds: self.uptime().as_secs_f64(),
            },
        }
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new()
    }
}

/// Records elapsed time for one call when dropped.
///
/// A drop during unwinding also counts the call as an error.
pub struct LatencyGuard<'a> {
    instrumentation: &'a Instrumentation,
    endpoint: Endpoint,
    started: Instant,
}

impl Drop for LatencyGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.instrumentation.record_error();
        }
        self.instrumentation
            .record_latency(self.endpoint, self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stats_fold() {
        let mut stats = LatencyStats::default();
        assert_eq!(stats.summary(), EndpointLatency::default());

        stats.record(0.2);
        stats.record(0.1);
        stats.record(0.6);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(0.1));
        assert_eq!(stats.max, Some(0.6));
        let summary = stats.summary();
        assert!((summary.avg_latency - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_observe_records_success_and_error_paths() {
        let instr = Instrumentation::new();

        let ok: Result<u32, &str> = instr.observe(Endpoint::GetMetric, || async { Ok(1) }).await;
        let err: Result<u32, &str> = instr
            .observe(Endpoint::GetMetric, || async { Err("nope") })
            .await;
        assert!(ok.is_ok());
        assert!(err.is_err());

        let stats = instr.latency_for(Endpoint::GetMetric).unwrap();
        assert_eq!(stats.count, 2);
        assert!(instr.latency_for(Endpoint::Stats).is_none());
    }

    #[test]
    fn test_guard_records_on_panic() {
        let instr = Instrumentation::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = instr.start(Endpoint::ListMetrics);
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(instr.latency_for(Endpoint::ListMetrics).unwrap().count, 1);
        assert_eq!(instr.errors(), 1);
    }

    #[tokio::test]
    async fn test_dropped_future_still_recorded() {
        let instr = Instrumentation::new();
        {
            let fut = instr.observe(Endpoint::AggregateMetrics, || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
            // Poll once so the guard exists, then drop the future
            let _ = tokio::time::timeout(Duration::from_millis(10), fut).await;
        }
        assert_eq!(
            instr.latency_for(Endpoint::AggregateMetrics).unwrap().count,
            1
        );
        assert_eq!(instr.errors(), 0);
    }

    #[test]
    fn test_stats_payload() {
        let instr = Instrumentation::new();
        instr.record_request();
        instr.record_request();
        instr.record_error();
        instr.record_latency(Endpoint::Stats, Duration::from_millis(4));

        let stats = instr.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.errors, 1);
        let entry = stats.latency.endpoints["stats"];
        assert_eq!(entry.min_latency, 0.004);
        assert_eq!(entry.max_latency, 0.004);
        assert!(stats.latency.uptime_seconds >= 0.0);
    }
}
