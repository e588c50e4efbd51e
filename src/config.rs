//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::review::TimeScale;
use crate::{AppError, Result};

/// Periodic due-scan settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScanConfig {
    /// Seconds between due-scans; defaults depend on the time scale.
    #[serde(default)]
    pub interval_seconds: Option<u64>,
}

/// Insertion queue settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FeedConfig {
    /// Milliseconds between drain steps.
    #[serde(default = "default_drain_delay_ms")]
    pub drain_delay_ms: u64,
    /// Minimum number of foreign items between resurfaced ones.
    #[serde(default = "default_minimum_gap")]
    pub minimum_gap: usize,
    /// Look-ahead and look-behind, in screen heights.
    #[serde(default = "default_viewport_buffer")]
    pub viewport_buffer: f64,
    /// Pixels from the document bottom that resume draining.
    #[serde(default = "default_scroll_threshold_px")]
    pub scroll_threshold_px: f64,
}

fn default_drain_delay_ms() -> u64 {
    500
}

fn default_minimum_gap() -> usize {
    5
}

fn default_viewport_buffer() -> f64 {
    2.0
}

fn default_scroll_threshold_px() -> f64 {
    100.0
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            drain_delay_ms: default_drain_delay_ms(),
            minimum_gap: default_minimum_gap(),
            viewport_buffer: default_viewport_buffer(),
            scroll_threshold_px: default_scroll_threshold_px(),
        }
    }
}

/// Fixed-backoff wait for the host feed container.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Milliseconds between readiness checks.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    /// Probes before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("resurfacer.db")
}

/// Global configuration parsed from `config.toml`.
///
/// Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Length of a scheduling day and year.
    #[serde(default)]
    pub time_scale: TimeScale,
    /// Due-scan settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Insertion queue settings.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Feed readiness retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            time_scale: TimeScale::default(),
            scan: ScanConfig::default(),
            feed: FeedConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective due-scan period.
    ///
    /// Falls back to 60 s on the standard scale and 15 s on the compressed one.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        let seconds = self.scan.interval_seconds.unwrap_or(match self.time_scale {
            TimeScale::Standard => 60,
            TimeScale::Compressed => 15,
        });
        Duration::from_secs(seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.interval_seconds == Some(0) {
            return Err(AppError::Config(
                "scan.interval_seconds must be greater than zero".into(),
            ));
        }

        if self.feed.drain_delay_ms == 0 {
            return Err(AppError::Config(
                "feed.drain_delay_ms must be greater than zero".into(),
            ));
        }

        if self.feed.minimum_gap == 0 {
            return Err(AppError::Config(
                "feed.minimum_gap must be greater than zero".into(),
            ));
        }

        if !(self.feed.viewport_buffer.is_finite() && self.feed.viewport_buffer >= 0.0) {
            return Err(AppError::Config(
                "feed.viewport_buffer must be a non-negative number".into(),
            ));
        }

        if !(self.feed.scroll_threshold_px.is_finite() && self.feed.scroll_threshold_px >= 0.0) {
            return Err(AppError::Config(
                "feed.scroll_threshold_px must be a non-negative number".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
