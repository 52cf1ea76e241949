//! Query layer: freshness-checked reads over the telemetry store
//!
//! Each operation is composed as instrumentation(counting(lookup)):
//! - the latency guard wraps the whole call
//! - `requests` is bumped on entry, `errors` on any error result
//!
//! Aggregates ignore freshness; they are a cumulative view.

use crate::freshness::FreshnessPolicy;
use crate::instrumentation::Instrumentation;
use crate::store::SharedStore;
use chrono::Utc;
use netpulse_common::{
    AggregateResponse, Endpoint, ListResponse, MetricReading, MetricResponse, StatsResponse,
    ERR_METRIC_NOT_FOUND, ERR_NO_FRESH_DATA, ERR_STALE,
};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Unknown device or metric, or missing parameters
    #[error("{}", ERR_METRIC_NOT_FOUND)]
    NotFound,

    /// The series exists but its latest sample is older than the threshold
    #[error("{}", ERR_STALE)]
    Stale,

    /// No device has a fresh sample for the requested metric
    #[error("{}", ERR_NO_FRESH_DATA)]
    NoFreshData,
}

/// The four read operations served over HTTP
#[derive(Clone)]
pub struct QueryService {
    store: SharedStore,
    freshness: FreshnessPolicy,
    instrumentation: Arc<Instrumentation>,
}

impl QueryService {
    pub fn new(
        store: SharedStore,
        freshness: FreshnessPolicy,
        instrumentation: Arc<Instrumentation>,
    ) -> Self {
        Self {
            store,
            freshness,
            instrumentation,
        }
    }

    pub fn instrumentation(&self) -> &Arc<Instrumentation> {
        &self.instrumentation
    }

    /// Latest fresh sample for one (device, metric)
    pub async fn get_metric(
        &self,
        switch_id: Option<&str>,
        metric: Option<&str>,
    ) -> Result<MetricResponse, QueryError> {
        self.instrumentation
            .observe(Endpoint::GetMetric, || {
                self.counted(self.lookup_metric(switch_id, metric))
            })
            .await
    }

    /// Latest fresh sample of `metric` for every device that has one
    pub async fn list_metric(&self, metric: Option<&str>) -> Result<ListResponse, QueryError> {
        self.instrumentation
            .observe(Endpoint::ListMetrics, || {
                self.counted(self.collect_fresh(metric))
            })
            .await
    }

    /// Request counters, per-endpoint latency and uptime
    pub async fn stats(&self) -> StatsResponse {
        self.instrumentation
            .observe(Endpoint::Stats, || async move {
                self.instrumentation.record_request();
                self.instrumentation.stats()
            })
            .await
    }

    /// Max latency, min bandwidth and total errors per device, over all history
    pub async fn aggregate(&self) -> AggregateResponse {
        self.instrumentation
            .observe(Endpoint::AggregateMetrics, || async move {
                self.instrumentation.record_request();
                self.store.read().await.aggregate()
            })
            .await
    }

    async fn counted<T, Fut>(&self, op: Fut) -> Result<T, QueryError>
    where
        Fut: Future<Output = Result<T, QueryError>>,
    {
        self.instrumentation.record_request();
        let result = op.await;
        if result.is_err() {
            self.instrumentation.record_error();
        }
        result
    }

    async fn lookup_metric(
        &self,
        switch_id: Option<&str>,
        metric: Option<&str>,
    ) -> Result<MetricResponse, QueryError> {
        let (switch_id, metric) = switch_id.zip(metric).ok_or(QueryError::NotFound)?;

        let sample = self
            .store
            .read()
            .await
            .latest(switch_id, metric)
            .ok_or(QueryError::NotFound)?;

        let now = Utc::now();
        if !self.freshness.is_fresh(sample.timestamp, now) {
            debug!(
                "{}/{} is stale: age {}s exceeds {}s",
                switch_id,
                metric,
                (now - sample.timestamp).num_seconds(),
                self.freshness.threshold().num_seconds()
            );
            return Err(QueryError::Stale);
        }

        Ok(MetricResponse {
            switch_id: switch_id.to_string(),
            metric: metric.to_string(),
            value: sample.value,
            timestamp: sample.timestamp_string(),
        })
    }

    async fn collect_fresh(&self, metric: Option<&str>) -> Result<ListResponse, QueryError> {
        let metric = metric.ok_or(QueryError::NoFreshData)?;
        let latest = self.store.read().await.all_series(metric);
        let now = Utc::now();

        let result: ListResponse = latest
            .into_iter()
            .filter(|(_, sample)| self.freshness.is_fresh(sample.timestamp, now))
            .map(|(device, sample)| {
                (
                    device,
                    MetricReading {
                        value: sample.value,
                        timestamp: sample.timestamp_string(),
                    },
                )
            })
            .collect();

        if result.is_empty() {
            return Err(QueryError::NoFreshData);
        }
        Ok(result)
    }
}
