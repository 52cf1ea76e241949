//! Human-readable rendering of query responses

use netpulse_common::{
    AggregateResponse, HealthResponse, ListResponse, MetricResponse, StatsResponse,
};
use owo_colors::OwoColorize;
use std::fmt::Write;

pub fn render_metric(metric: &MetricResponse) -> String {
    format!(
        "{} {} = {} (at {})",
        metric.switch_id.bold(),
        metric.metric,
        format_value(metric.value).cyan(),
        metric.timestamp
    )
}

pub fn render_listing(metric: &str, listing: &ListResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!("{:<16} {:>12}  {}", "SWITCH", metric.to_uppercase(), "TIMESTAMP").bold()
    );
    for (switch_id, reading) in listing {
        let _ = writeln!(
            out,
            "{:<16} {:>12}  {}",
            switch_id,
            format_value(reading.value),
            reading.timestamp
        );
    }
    out
}

pub fn render_stats(stats: &StatsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", "Requests".bold(), stats.requests);
    let _ = writeln!(out, "{}: {}", "Errors".bold(), stats.errors);
    let _ = writeln!(
        out,
        "{}: {}",
        "Uptime".bold(),
        format_duration(stats.latency.uptime_seconds)
    );

    if stats.latency.endpoints.is_empty() {
        let _ = writeln!(out, "{}", "No endpoint latency recorded yet".dimmed());
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        format!("{:<20} {:>10} {:>10} {:>10}", "ENDPOINT", "AVG ms", "MIN ms", "MAX ms").bold()
    );
    for (endpoint, latency) in &stats.latency.endpoints {
        let _ = writeln!(
            out,
            "{:<20} {:>10.3} {:>10.3} {:>10.3}",
            endpoint,
            latency.avg_latency * 1000.0,
            latency.min_latency * 1000.0,
            latency.max_latency * 1000.0
        );
    }
    out
}

pub fn render_aggregate(aggregate: &AggregateResponse) -> String {
    let mut out = String::new();
    if aggregate.is_empty() {
        let _ = writeln!(out, "{}", "No devices reported yet".dimmed());
        return out;
    }

    let _ = writeln!(
        out,
        "{}",
        format!(
            "{:<16} {:>12} {:>14} {:>12}",
            "SWITCH", "MAX LATENCY", "MIN BANDWIDTH", "ERRORS"
        )
        .bold()
    );
    for (switch_id, agg) in aggregate {
        let _ = writeln!(
            out,
            "{:<16} {:>12} {:>14} {:>12}",
            switch_id,
            format_value(agg.max_latency),
            format_value(agg.min_bandwidth),
            format_value(agg.total_errors)
        );
    }
    out
}

pub fn render_health(health: &HealthResponse) -> String {
    let status = match health.status.as_str() {
        "ok" => health.status.green().to_string(),
        "starting" => health.status.yellow().to_string(),
        _ => health.status.red().to_string(),
    };

    let poller = &health.poller;
    let mut out = String::new();
    let _ = writeln!(out, "{}: {} (v{})", "Status".bold(), status, health.version);
    let _ = writeln!(
        out,
        "{}: {}",
        "Uptime".bold(),
        format_duration(health.uptime_seconds as f64)
    );
    let _ = writeln!(
        out,
        "{}: {} devices, {} series",
        "Store".bold(),
        health.devices,
        health.series
    );
    let _ = writeln!(
        out,
        "{}: {} ticks, {} ok, {} failed ({} consecutive), {} samples",
        "Poller".bold(),
        poller.ticks,
        poller.successes,
        poller.failures,
        poller.consecutive_failures,
        poller.samples_ingested
    );
    if let Some(last) = poller.last_success {
        let _ = writeln!(out, "{}: {}", "Last success".bold(), last.to_rfc3339());
    }
    if let Some(ref error) = poller.last_error {
        let _ = writeln!(out, "{}: {}", "Last error".bold(), error.red());
    }
    out
}

pub fn render_failure(status: u16, error: &str) -> String {
    format!("{} {}", format!("Error ({}):", status).red().bold(), error)
}

/// Integers print without a fraction, everything else with three decimals
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
