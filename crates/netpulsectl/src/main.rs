//! Netpulse Control - CLI client for netpulsed
//!
//! Queries the daemon's telemetry API and prints either a short table or the
//! raw JSON payload.

use anyhow::Result;
use clap::{Parser, Subcommand};
use netpulse_common::Endpoint;
use netpulsectl::client::{NetpulseClient, RawReply, Reply, DEFAULT_URL};
use netpulsectl::output;
use owo_colors::OwoColorize;

#[derive(Parser)]
#[command(name = "netpulsectl")]
#[command(about = "Netpulse - query switch telemetry from netpulsed", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the netpulsed API
    #[arg(long, global = true, default_value = DEFAULT_URL)]
    url: String,

    /// Print the raw JSON response
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest fresh value of one metric on one switch
    Get {
        #[arg(long)]
        switch_id: String,

        #[arg(long)]
        metric: String,
    },

    /// Latest fresh value of a metric across all switches
    List {
        #[arg(long)]
        metric: String,
    },

    /// Request counters and per-endpoint latency
    Stats,

    /// Max latency, min bandwidth and total errors per switch
    Aggregate,

    /// Daemon and poller health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = NetpulseClient::new(&cli.url)?;

    let ok = if cli.json {
        let raw = match &cli.command {
            Commands::Get { switch_id, metric } => {
                client
                    .fetch(
                        Endpoint::GetMetric.path(),
                        &[("switch_id", switch_id.as_str()), ("metric", metric.as_str())],
                    )
                    .await?
            }
            Commands::List { metric } => {
                client
                    .fetch(Endpoint::ListMetrics.path(), &[("metric", metric.as_str())])
                    .await?
            }
            Commands::Stats => client.fetch(Endpoint::Stats.path(), &[]).await?,
            Commands::Aggregate => client.fetch(Endpoint::AggregateMetrics.path(), &[]).await?,
            Commands::Health => client.fetch("/health", &[]).await?,
        };
        print_raw(&raw)
    } else {
        match &cli.command {
            Commands::Get { switch_id, metric } => show(
                client.get_metric(switch_id, metric).await?,
                output::render_metric,
            ),
            Commands::List { metric } => show(client.list_metric(metric).await?, |listing| {
                output::render_listing(metric, listing)
            }),
            Commands::Stats => show(client.stats().await?, output::render_stats),
            Commands::Aggregate => show(client.aggregate().await?, output::render_aggregate),
            Commands::Health => show(client.health().await?, output::render_health),
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_raw(raw: &RawReply) -> bool {
    if raw.is_success() {
        println!("{}", raw.body.trim_end());
    } else {
        eprintln!("{}", raw.body.trim_end());
    }
    raw.is_success()
}

fn show<T>(reply: Reply<T>, render: impl Fn(&T) -> String) -> bool {
    match reply {
        Reply::Ok(payload) => {
            println!("{}", render(&payload).trim_end());
            true
        }
        Reply::Failed { status, error } => {
            eprintln!("{}", output::render_failure(status, &error));
            if status == 503 {
                eprintln!(
                    "{}",
                    "Is the poller reaching its upstream? Try `netpulsectl health`.".dimmed()
                );
            }
            false
        }
    }
}
