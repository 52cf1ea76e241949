//! HTTP server for netpulsed

use crate::metrics::DaemonMetrics;
use crate::poller::SharedPollerStatus;
use crate::query::QueryService;
use crate::routes;
use crate::store::SharedStore;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub query: QueryService,
    pub store: SharedStore,
    pub poller_status: SharedPollerStatus,
    pub metrics: Option<Arc<DaemonMetrics>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(query: QueryService, store: SharedStore, poller_status: SharedPollerStatus) -> Self {
        Self {
            query,
            store,
            poller_status,
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Expose Prometheus metrics on /metrics
    pub fn with_metrics(mut self, metrics: Arc<DaemonMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Build the full router
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::telemetry_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(CatchPanicLayer::custom(routes::panic_response))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` is cancelled
pub async fn run(state: AppState, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
    let app = router(state);

    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
