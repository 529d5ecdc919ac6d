//! Configuration settings for sace-queue.
//!
//! Settings are loaded from `~/.sace-queue/config.yaml`. Every field has a
//! default, so a missing or partial file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::sync::MAX_RETRIES;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Offline queue settings.
    pub queue: QueueConfig,
    /// Connectivity probe settings.
    pub connectivity: ConnectivityConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Offline queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Failed replay attempts before an operation is dropped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Settings for the TCP connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Address (`host:port`) probed to decide reachability.
    #[serde(default = "default_probe_address")]
    pub probe_address: String,
    /// Seconds between probes.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    /// Connect timeout per probe in milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

const fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_probe_address() -> String {
    "8.8.8.8:53".to_string()
}

const fn default_probe_interval() -> u64 {
    5
}

const fn default_probe_timeout() -> u64 {
    1500
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_address: default_probe_address(),
            probe_interval_secs: default_probe_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ConnectivityConfig {
    /// Interval between probes, at least one second.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        if self.probe_interval_secs == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.probe_interval_secs)
        }
    }

    /// Connect timeout for a single probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if it sets `queue.max_retries` to zero.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, QueueError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            QueueError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            QueueError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        if config.queue.max_retries == 0 {
            return Err(QueueError::Config(
                "queue.max_retries must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}
