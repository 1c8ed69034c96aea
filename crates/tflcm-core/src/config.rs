//! Buffer configuration – read from a TOML file with `TFLCM_*` environment
//! overrides.
//!
//! ```toml
//! cache_time_secs = 30.0
//! time_tolerance_ms = 100
//! debug = true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tflcm_types::TfError;

/// Errors that can arise while loading or saving a [`BufferConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for TfError {
    fn from(e: ConfigError) -> Self {
        TfError::Config(e.to_string())
    }
}

/// Tunables of a [`TransformBuffer`][crate::TransformBuffer].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Retention window for dynamic records, in seconds.
    #[serde(default = "default_cache_time_secs")]
    pub cache_time_secs: f64,

    /// Default time tolerance for lookups, in milliseconds.
    #[serde(default = "default_time_tolerance_ms")]
    pub time_tolerance_ms: u64,

    /// Tolerances or query-time offsets from "now" above this many seconds
    /// are read as log replay.
    #[serde(default = "default_replay_threshold_secs")]
    pub replay_threshold_secs: f64,

    /// Poll interval of the blocking wait, in milliseconds.
    #[serde(default = "default_wait_poll_interval_ms")]
    pub wait_poll_interval_ms: u64,

    /// Tolerance the blocking wait checks availability with, in seconds.
    #[serde(default = "default_wait_tolerance_secs")]
    pub wait_tolerance_secs: f64,

    /// Initial state of the debug-output toggle.
    #[serde(default)]
    pub debug: bool,
}

fn default_cache_time_secs() -> f64 {
    10.0
}
fn default_time_tolerance_ms() -> u64 {
    100
}
fn default_replay_threshold_secs() -> f64 {
    1000.0
}
fn default_wait_poll_interval_ms() -> u64 {
    10
}
fn default_wait_tolerance_secs() -> f64 {
    10_000.0
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            cache_time_secs: default_cache_time_secs(),
            time_tolerance_ms: default_time_tolerance_ms(),
            replay_threshold_secs: default_replay_threshold_secs(),
            wait_poll_interval_ms: default_wait_poll_interval_ms(),
            wait_tolerance_secs: default_wait_tolerance_secs(),
            debug: false,
        }
    }
}

/// Negative and NaN seconds clamp to zero, infinity saturates.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl BufferConfig {
    pub fn cache_time(&self) -> Duration {
        secs(self.cache_time_secs)
    }

    pub fn time_tolerance(&self) -> Duration {
        Duration::from_millis(self.time_tolerance_ms)
    }

    pub fn replay_threshold(&self) -> Duration {
        secs(self.replay_threshold_secs)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms.max(1))
    }

    pub fn wait_tolerance(&self) -> Duration {
        secs(self.wait_tolerance_secs)
    }

    /// Load the config from `path`, applying environment overrides.
    /// Returns `None` if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg: Self = toml::from_str(&raw)?;
        cfg.apply_env_overrides();
        Ok(Some(cfg))
    }

    /// Write the config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(io_err)?;
        Ok(())
    }

    /// Apply `TFLCM_*` environment variable overrides.  Unparseable or
    /// out-of-range values are ignored.
    ///
    /// | Variable | Config field |
    /// |---|---|
    /// | `TFLCM_CACHE_TIME` | `cache_time_secs` |
    /// | `TFLCM_TIME_TOLERANCE_MS` | `time_tolerance_ms` |
    /// | `TFLCM_REPLAY_THRESHOLD` | `replay_threshold_secs` |
    /// | `TFLCM_WAIT_POLL_MS` | `wait_poll_interval_ms` |
    /// | `TFLCM_DEBUG` | `debug` |
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_secs("TFLCM_CACHE_TIME") {
            self.cache_time_secs = v;
        }
        if let Ok(v) = std::env::var("TFLCM_TIME_TOLERANCE_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.time_tolerance_ms = ms;
        }
        if let Some(v) = env_secs("TFLCM_REPLAY_THRESHOLD") {
            self.replay_threshold_secs = v;
        }
        if let Ok(v) = std::env::var("TFLCM_WAIT_POLL_MS")
            && let Ok(ms) = v.parse::<u64>()
            && ms > 0
        {
            self.wait_poll_interval_ms = ms;
        }
        if let Ok(v) = std::env::var("TFLCM_DEBUG") {
            match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => self.debug = true,
                "0" | "false" | "off" => self.debug = false,
                _ => {}
            }
        }
    }
}

fn env_secs(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
