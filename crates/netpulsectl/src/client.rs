//! HTTP client for the netpulsed query API.

use anyhow::{Context, Result};
use netpulse_common::{
    AggregateResponse, Endpoint, ErrorResponse, HealthResponse, ListResponse, MetricResponse,
    StatsResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8080";

/// Status code and body exactly as the daemon sent them
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

/// A decoded reply: the success payload or the daemon's error payload
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    Failed { status: u16, error: String },
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<Reply<T>> {
        if self.is_success() {
            let payload = serde_json::from_str(&self.body)
                .with_context(|| format!("Unexpected response body: {}", self.body))?;
            return Ok(Reply::Ok(payload));
        }

        // Non-JSON error bodies (proxies, 405s) fall back to the raw text
        let error = serde_json::from_str::<ErrorResponse>(&self.body)
            .map(|e| e.error)
            .unwrap_or_else(|_| self.body.trim().to_string());

        Ok(Reply::Failed {
            status: self.status,
            error,
        })
    }
}

/// Client for one netpulsed instance
pub struct NetpulseClient {
    http: reqwest::Client,
    base_url: String,
}

impl NetpulseClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with query parameters, without interpreting the body
    pub async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<RawReply> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Cannot reach netpulsed at {}", self.base_url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;

        Ok(RawReply { status, body })
    }

    pub async fn get_metric(&self, switch_id: &str, metric: &str) -> Result<Reply<MetricResponse>> {
        self.fetch(
            Endpoint::GetMetric.path(),
            &[("switch_id", switch_id), ("metric", metric)],
        )
        .await?
        .decode()
    }

    pub async fn list_metric(&self, metric: &str) -> Result<Reply<ListResponse>> {
        self.fetch(Endpoint::ListMetrics.path(), &[("metric", metric)])
            .await?
            .decode()
    }

    pub async fn stats(&self) -> Result<Reply<StatsResponse>> {
        self.fetch(Endpoint::Stats.path(), &[]).await?.decode()
    }

    pub async fn aggregate(&self) -> Result<Reply<AggregateResponse>> {
        self.fetch(Endpoint::AggregateMetrics.path(), &[])
            .await?
            .decode()
    }

    pub async fn health(&self) -> Result<Reply<HealthResponse>> {
        self.fetch("/health", &[]).await?.decode()
    }
}
