//! API routes for netpulsed
//!
//! Query routes translate [`QueryError`] into status codes and `{"error": ...}`
//! payloads. Query-string problems never reach axum's default 400 rejection;
//! they degrade to missing parameters.

use crate::query::QueryError;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use netpulse_common::{
    AggregateResponse, Endpoint, ErrorResponse, HealthResponse, ListResponse, MetricResponse,
    StatsResponse, ERR_METRIC_NOT_FOUND,
};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tracing::error;

type AppStateArc = Arc<AppState>;

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match self {
            QueryError::NotFound => StatusCode::NOT_FOUND,
            QueryError::Stale | QueryError::NoFreshData => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Panics inside a handler surface as the not-found payload
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(ERR_METRIC_NOT_FOUND)),
    )
        .into_response()
}

// ============================================================================
// Telemetry Routes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GetMetricParams {
    pub switch_id: Option<String>,
    pub metric: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMetricParams {
    pub metric: Option<String>,
}

pub fn telemetry_routes() -> Router<AppStateArc> {
    Router::new()
        .route(Endpoint::GetMetric.path(), get(get_metric))
        .route(Endpoint::ListMetrics.path(), get(list_metric))
        .route(Endpoint::Stats.path(), get(stats))
        .route(Endpoint::AggregateMetrics.path(), get(aggregate))
}

async fn get_metric(
    State(state): State<AppStateArc>,
    params: Option<Query<GetMetricParams>>,
) -> Result<Json<MetricResponse>, QueryError> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let response = state
        .query
        .get_metric(params.switch_id.as_deref(), params.metric.as_deref())
        .await?;
    Ok(Json(response))
}

async fn list_metric(
    State(state): State<AppStateArc>,
    params: Option<Query<ListMetricParams>>,
) -> Result<Json<ListResponse>, QueryError> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let response = state.query.list_metric(params.metric.as_deref()).await?;
    Ok(Json(response))
}

async fn stats(State(state): State<AppStateArc>) -> Json<StatsResponse> {
    Json(state.query.stats().await)
}

async fn aggregate(State(state): State<AppStateArc>) -> Json<AggregateResponse> {
    Json(state.query.aggregate().await)
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let poller = state.poller_status.read().await.clone();
    let (devices, series) = {
        let store = state.store.read().await;
        (store.device_count(), store.series_count())
    };

    let status = if poller.ticks == 0 {
        "starting"
    } else if poller.consecutive_failures == 0 {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        poller,
        devices,
        series,
    })
}

async fn prometheus_metrics(State(state): State<AppStateArc>) -> Response {
    let Some(ref metrics) = state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match metrics.export() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
