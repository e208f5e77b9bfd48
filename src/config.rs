//! Layered settings for the CLI.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `PINGWATCH_*` environment variables (`PINGWATCH_HOSTS` is a
//!    comma-separated list)
//! 4. command-line flags
//!
//! ```toml
//! hosts = ["192.168.1.1", "https://example.com"]
//! interval_secs = 2.0
//! timeout_ms = 1000
//! history_capacity = 120
//! queue_capacity = 1000
//! json = false
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use pingwatch_engine::{DEFAULT_QUEUE_CAPACITY, MIN_INTERVAL_SECS};
use pingwatch_types::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};

/// Prefix for environment variables.
pub const ENV_PREFIX: &str = "PINGWATCH";

/// Effective CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hosts to monitor from the start.
    pub hosts: Vec<String>,
    /// Seconds between probes of one host.
    pub interval_secs: f64,
    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// History entries kept per host.
    pub history_capacity: usize,
    /// Update events buffered before the oldest is dropped.
    pub queue_capacity: usize,
    /// Print one JSON object per line instead of text.
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            interval_secs: 1.0,
            timeout_ms: 1000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            json: false,
        }
    }
}

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub hosts: Vec<String>,
    pub interval_secs: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub json: bool,
}

impl Settings {
    /// Load defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load) but reading variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hosts")
                .source(env),
        );

        let config = builder.build().with_context(|| match path {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "failed to read PINGWATCH_* environment".to_string(),
        })?;

        config
            .try_deserialize()
            .context("invalid pingwatch configuration")
    }

    /// Apply command-line values on top.
    ///
    /// Hosts given on the command line replace the configured list.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if !overrides.hosts.is_empty() {
            self.hosts = overrides.hosts;
        }
        if let Some(secs) = overrides.interval_secs {
            self.interval_secs = secs;
        }
        if let Some(ms) = overrides.timeout_ms {
            self.timeout_ms = ms;
        }
        self.json |= overrides.json;
        self
    }

    /// Reject values the engine would refuse.
    pub fn validate(&self) -> Result<()> {
        if !self.interval_secs.is_finite() || self.interval_secs < MIN_INTERVAL_SECS {
            bail!(
                "interval_secs must be at least {MIN_INTERVAL_SECS}, got {}",
                self.interval_secs
            );
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// Probe interval. Call [`validate`](Self::validate) first.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs).unwrap_or(Duration::from_secs(1))
    }

    /// Per-probe timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
