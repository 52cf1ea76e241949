//! Configuration management for netpulsed.
//!
//! Loads settings from /etc/netpulse/config.toml or uses defaults.
//! Command-line flags override individual values after loading.

use crate::freshness::DEFAULT_FRESHNESS_THRESHOLD_SECS;
use crate::store::DEFAULT_MAX_SAMPLES_PER_SERIES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/netpulse/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetpulseConfig {
    /// Upstream CSV snapshot endpoint
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Address the query API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Time between poll ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single upstream fetch
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum sample age served by live queries
    #[serde(default = "default_freshness_threshold_secs")]
    pub freshness_threshold_secs: u64,

    /// Ring-buffer size per series (0 = unbounded)
    #[serde(default = "default_max_samples_per_series")]
    pub max_samples_per_series: usize,

    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:9001/counters".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_fetch_timeout_ms() -> u64 {
    2_000
}

fn default_freshness_threshold_secs() -> u64 {
    DEFAULT_FRESHNESS_THRESHOLD_SECS
}

fn default_max_samples_per_series() -> usize {
    DEFAULT_MAX_SAMPLES_PER_SERIES
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetpulseConfig {
    fn default() -> Self {
        Self {
            upstream_url: default_upstream_url(),
            listen_addr: default_listen_addr(),
            poll_interval_ms: default_poll_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            freshness_threshold_secs: default_freshness_threshold_secs(),
            max_samples_per_series: default_max_samples_per_series(),
            log_level: default_log_level(),
        }
    }
}

impl NetpulseConfig {
    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.upstream_url.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream_url is empty".to_string()));
        }
        self.listen_socket_addr()?;
        Ok(())
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::Invalid(format!("listen_addr '{}' is not host:port", self.listen_addr))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
