//! Switch Simulator - Mock upstream for netpulsed
//!
//! Usage:
//!   switch_sim --listen 127.0.0.1:9001 --switches 5
//!
//! Serves `GET /counters` as a CSV snapshot of N simulated switches. Every
//! counter is re-randomized once per second.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use clap::Parser;
use netpulse_common::{
    format_timestamp, METRIC_BANDWIDTH, METRIC_ERRORS, METRIC_LATENCY, SWITCH_ID_COLUMN,
    TIMESTAMP_COLUMN,
};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, info};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Parser)]
#[command(name = "switch_sim")]
#[command(about = "Serve simulated switch counters as CSV", long_about = None)]
struct Args {
    /// Address to serve /counters on
    #[arg(long, default_value = "127.0.0.1:9001")]
    listen: SocketAddr,

    /// Number of simulated switches
    #[arg(long, default_value_t = 5)]
    switches: usize,

    /// Milliseconds between counter updates
    #[arg(long, default_value_t = 1000)]
    update_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct SwitchCounters {
    switch_id: String,
    bandwidth: f64,
    latency: f64,
    errors: u32,
}

type SharedCounters = Arc<RwLock<Vec<SwitchCounters>>>;

// ============================================================================
// SIMULATOR LOGIC
// ============================================================================

fn random_counters<R: Rng>(rng: &mut R, switch_id: String) -> SwitchCounters {
    SwitchCounters {
        switch_id,
        bandwidth: rng.gen_range(10.0..100.0),
        latency: rng.gen_range(0.1..1.0),
        errors: rng.gen_range(0..=5),
    }
}

fn initial_counters<R: Rng>(rng: &mut R, switches: usize) -> Vec<SwitchCounters> {
    (1..=switches)
        .map(|n| random_counters(rng, format!("switch{}", n)))
        .collect()
}

fn rerandomize<R: Rng>(rng: &mut R, counters: &mut [SwitchCounters]) {
    for sw in counters.iter_mut() {
        let id = std::mem::take(&mut sw.switch_id);
        *sw = random_counters(rng, id);
    }
}

/// One CSV snapshot; every row carries the same timestamp
fn render_csv(counters: &[SwitchCounters], now: DateTime<Utc>) -> String {
    let ts = format_timestamp(&now);
    let mut lines = Vec::with_capacity(counters.len() + 1);
    lines.push(format!(
        "{},{},{},{},{}",
        SWITCH_ID_COLUMN, METRIC_BANDWIDTH, METRIC_LATENCY, METRIC_ERRORS, TIMESTAMP_COLUMN
    ));
    for sw in counters {
        lines.push(format!(
            "{},{},{},{},{}",
            sw.switch_id, sw.bandwidth, sw.latency, sw.errors, ts
        ));
    }
    lines.join("\n")
}

async fn update_loop(counters: SharedCounters, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut counters = counters.write().await;
        rerandomize(&mut rand::thread_rng(), &mut counters);
        debug!("Re-randomized {} switches", counters.len());
    }
}

async fn get_counters(State(counters): State<SharedCounters>) -> impl IntoResponse {
    let body = render_csv(&counters.read().await, Utc::now());
    ([(header::CONTENT_TYPE, "text/csv")], body)
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let counters: SharedCounters = Arc::new(RwLock::new(initial_counters(
        &mut rand::thread_rng(),
        args.switches,
    )));

    tokio::spawn(update_loop(
        Arc::clone(&counters),
        Duration::from_millis(args.update_ms.max(1)),
    ));

    let app = Router::new()
        .route("/counters", get(get_counters))
        .with_state(counters);

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;

    info!(
        "Switch simulator serving {} switches at http://{}/counters",
        args.switches, args.listen
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
