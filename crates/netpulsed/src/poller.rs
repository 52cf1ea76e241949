//! Poller - Periodic upstream snapshot ingestion
//!
//! On each tick: fetch the CSV snapshot, parse it, append every accepted
//! sample into the store in row order. Any failure is logged and the tick is
//! abandoned; the loop always sleeps and tries again. The loop exits only
//! when its cancellation token fires.

use crate::metrics::DaemonMetrics;
use crate::snapshot::{self, Snapshot, SnapshotError};
use crate::store::SharedStore;
use chrono::Utc;
use netpulse_common::PollerReport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poller errors. All of them are recovered locally by skipping the tick.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Upstream request failed: {0}")]
    Fetch(reqwest::Error),

    #[error("Upstream fetch timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl From<reqwest::Error> for PollError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PollError::Timeout
        } else {
            PollError::Fetch(e)
        }
    }
}

/// What one successful tick contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollOutcome {
    pub rows: usize,
    pub samples: usize,
    pub rejected_rows: usize,
    pub rejected_cells: usize,
}

/// Thread-safe poller status handle, read by the health endpoint
pub type SharedPollerStatus = Arc<RwLock<PollerReport>>;

pub struct Poller {
    http: reqwest::Client,
    url: String,
    interval: Duration,
    store: SharedStore,
    status: SharedPollerStatus,
    metrics: Option<Arc<DaemonMetrics>>,
}

impl Poller {
    /// Create a poller for `url`; every fetch is bounded by `timeout`
    pub fn new(
        url: impl Into<String>,
        interval: Duration,
        timeout: Duration,
        store: SharedStore,
    ) -> Result<Self, PollError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("netpulsed/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
            interval,
            store,
            status: Arc::new(RwLock::new(PollerReport::default())),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<DaemonMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn status(&self) -> SharedPollerStatus {
        Arc::clone(&self.status)
    }

    /// Run the loop on the current runtime until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!("Poller started: {} every {:?}", self.url, self.interval);

        loop {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.poll_once() => result,
            };
            self.record(result, started.elapsed()).await;

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Poller stopped");
    }

    /// One tick: fetch, parse, ingest
    pub async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        let body = self.fetch().await?;
        let snapshot = snapshot::parse(&body)?;
        Ok(self.ingest(&snapshot).await)
    }

    async fn fetch(&self) -> Result<String, PollError> {
        let response = self.http.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(PollError::Status(response.status()));
        }

        Ok(response.text().await?)
    }

    /// Append every accepted sample, in row order.
    ///
    /// The write lock is taken per row and released before the next one.
    pub async fn ingest(&self, snapshot: &Snapshot) -> PollOutcome {
        let mut samples = 0;
        for row in &snapshot.rows {
            let mut store = self.store.write().await;
            store.register_device(&row.switch_id);
            for (metric, value) in &row.values {
                store.append(&row.switch_id, metric, row.timestamp, *value);
                samples += 1;
            }
        }

        if let Some(ref metrics) = self.metrics {
            let store = self.store.read().await;
            metrics.update_store_size(store.device_count(), store.series_count());
            metrics.record_ingest(samples, snapshot.rejected_rows, snapshot.rejected_cells);
        }

        PollOutcome {
            rows: snapshot.rows.len(),
            samples,
            rejected_rows: snapshot.rejected_rows,
            rejected_cells: snapshot.rejected_cells,
        }
    }

    async fn record(&self, result: Result<PollOutcome, PollError>, elapsed: Duration) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_poll(result.is_ok(), elapsed);
        }

        let mut status = self.status.write().await;
        status.ticks += 1;

        match result {
            Ok(outcome) => {
                status.successes += 1;
                status.consecutive_failures = 0;
                status.samples_ingested += outcome.samples as u64;
                status.last_success = Some(Utc::now());
                debug!(
                    "Poll ok: {} rows, {} samples ({} rows / {} cells rejected) in {:?}",
                    outcome.rows,
                    outcome.samples,
                    outcome.rejected_rows,
                    outcome.rejected_cells,
                    elapsed
                );
            }
            Err(e) => {
                status.failures += 1;
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
                warn!(
                    "Poll failed ({} consecutive): {}",
                    status.consecutive_failures, e
                );
            }
        }
    }
}
