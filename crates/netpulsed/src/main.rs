//! Netpulse Daemon - Switch telemetry poller and query API
//!
//! Polls an upstream CSV counter endpoint, keeps a bounded in-memory history
//! per device and metric, and serves freshness-checked queries over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use netpulsed::config::{NetpulseConfig, CONFIG_PATH};
use netpulsed::freshness::FreshnessPolicy;
use netpulsed::instrumentation::Instrumentation;
use netpulsed::metrics::DaemonMetrics;
use netpulsed::poller::Poller;
use netpulsed::query::QueryService;
use netpulsed::server::{self, AppState};
use netpulsed::store::create_shared_store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netpulsed")]
#[command(about = "Netpulse daemon - switch telemetry poller and query API", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Override listen address (host:port)
    #[arg(long)]
    listen: Option<String>,

    /// Override upstream snapshot URL
    #[arg(long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = NetpulseConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(upstream) = args.upstream {
        config.upstream_url = upstream;
    }
    config.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Netpulse Daemon v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Upstream {} every {}ms (timeout {}ms), freshness {}s, retention {} samples/series",
        config.upstream_url,
        config.poll_interval_ms,
        config.fetch_timeout_ms,
        config.freshness_threshold_secs,
        config.max_samples_per_series
    );

    let metrics = Arc::new(DaemonMetrics::new().context("Failed to register metrics")?);
    let store = create_shared_store(config.max_samples_per_series);
    let instrumentation = Arc::new(Instrumentation::new_with_metrics(Arc::clone(&metrics)));
    let query = QueryService::new(
        store.clone(),
        FreshnessPolicy::from_secs(config.freshness_threshold_secs),
        instrumentation,
    );

    let poller = Poller::new(
        config.upstream_url.clone(),
        config.poll_interval(),
        config.fetch_timeout(),
        store.clone(),
    )
    .context("Failed to build upstream HTTP client")?
    .with_metrics(Arc::clone(&metrics));

    let state = AppState::new(query, store, poller.status()).with_metrics(metrics);

    let addr = config.listen_socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let shutdown = CancellationToken::new();
    let poller_task = poller.spawn(shutdown.child_token());
    let mut server_task = tokio::spawn(server::run(state, listener, shutdown.clone()));

    info!("Netpulse Daemon ready");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down gracefully");
        }
        result = &mut server_task => {
            error!("HTTP server exited unexpectedly");
            shutdown.cancel();
            poller_task.await?;
            return result?;
        }
    }

    shutdown.cancel();
    poller_task.await?;
    server_task.await??;

    info!("Netpulse Daemon stopped");
    Ok(())
}
