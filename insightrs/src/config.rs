//! Configuration system for the analytics core.
//!
//! Supports TOML-based configuration; every section and key is optional and
//! falls back to the built-in defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InsightConfig {
    pub dispatcher: DispatcherConfig,
    pub filter_options: FilterOptionsConfig,
    pub kpi: KpiConfig,
}

/// Query dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How long a successful result may be replayed for an identical query (default: 30).
    pub result_cache_ttl_secs: u64,
    /// Maximum cached results (default: 1, only the latest success). 0 disables the cache.
    pub result_cache_max_size: usize,
}

/// Remote filter option lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterOptionsConfig {
    /// Staleness window of a fetched option list in seconds (default: 600).
    pub ttl_secs: u64,
    /// How long a failed fetch is kept before the next lookup retries (default: 30).
    pub failure_ttl_secs: u64,
}

/// Summary card refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Staleness window of the headline figures in seconds (default: 300).
    pub ttl_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            result_cache_ttl_secs: 30,
            result_cache_max_size: 1,
        }
    }
}

impl Default for FilterOptionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            failure_ttl_secs: 30,
        }
    }
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl DispatcherConfig {
    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }
}

impl FilterOptionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn failure_ttl(&self) -> Duration {
        Duration::from_secs(self.failure_ttl_secs)
    }
}

impl KpiConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl InsightConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| InsightError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| InsightError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `INSIGHT_CONFIG` environment variable
    /// 2. `./insight.toml` (current directory)
    /// 3. `~/.config/insight/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("INSIGHT_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from INSIGHT_CONFIG");
                    return cfg;
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "ignoring INSIGHT_CONFIG");
                }
            }
        }

        if let Ok(cfg) = Self::from_file("insight.toml") {
            tracing::info!("loaded config from ./insight.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("insight").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}
