//! Configuration module for the process engine
//!
//! Engine-wide settings that are not part of any chain topology:
//! - Output telemetry window size
//! - Listener queue depth for output subscriptions
//! - Retention of collectors and the fault channel
//! - Worker thread naming
//! - Logging filter and optional log directory (used by the binary)
//!
//! # Config Location
//!
//! The default config file lives in the platform-appropriate location:
//! - **Linux**: `~/.config/dev.hxyulin.sensorchain/engine.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.sensorchain/engine.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.sensorchain\engine.toml`
//!
//! # Example
//!
//! ```ignore
//! use sensorchain::config::EngineConfig;
//!
//! let config = EngineConfig::load_or_default(EngineConfig::default_path());
//! let chain = CompositeProcess::with_config("chain", config);
//! ```

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.sensorchain";

/// Config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Number of inter-arrival deltas kept per output port
pub const DEFAULT_TELEMETRY_WINDOW: usize = 10;

/// Pending notifications per output subscription
pub const DEFAULT_LISTENER_QUEUE_DEPTH: usize = 1;

/// Records kept by each collector before the oldest are dropped
pub const DEFAULT_COLLECTOR_CAPACITY: usize = 1024;

/// Undrained faults held by `start_with_channel`
pub const DEFAULT_FAULT_QUEUE_DEPTH: usize = 64;

/// Default tracing filter for the binary
pub const DEFAULT_LOG_FILTER: &str = "info,sensorchain=debug";

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots in each output's sampling-interval estimator.
    pub telemetry_window: usize,

    /// Capacity of each listener's notification queue.
    pub listener_queue_depth: usize,

    /// Records a collector keeps unless it was given its own capacity.
    pub collector_capacity: usize,

    /// Capacity of the fault channel returned by `start_with_channel`.
    pub fault_queue_depth: usize,

    /// Prefix for streaming worker thread names.
    pub worker_name_prefix: String,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Directory for rolling log files. Console only when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            telemetry_window: DEFAULT_TELEMETRY_WINDOW,
            listener_queue_depth: DEFAULT_LISTENER_QUEUE_DEPTH,
            collector_capacity: DEFAULT_COLLECTOR_CAPACITY,
            fault_queue_depth: DEFAULT_FAULT_QUEUE_DEPTH,
            worker_name_prefix: "chain".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| ChainError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChainError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load a config file, falling back to defaults if it is missing or invalid.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring config {:?}: {}", path, e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Save the config as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| ChainError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Path of the default config file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.telemetry_window == 0 {
            return Err(ChainError::Config(
                "telemetry_window must be at least 1".to_string(),
            ));
        }
        if self.listener_queue_depth == 0 {
            return Err(ChainError::Config(
                "listener_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.collector_capacity == 0 {
            return Err(ChainError::Config(
                "collector_capacity must be at least 1".to_string(),
            ));
        }
        if self.fault_queue_depth == 0 {
            return Err(ChainError::Config(
                "fault_queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.telemetry_window, 10);
        assert_eq!(config.listener_queue_depth, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("telemetry_window = 4").unwrap();
        assert_eq!(config.telemetry_window, 4);
        assert_eq!(config.worker_name_prefix, "chain");
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = EngineConfig::from_toml_str("telemetry_window = 0").unwrap_err();
        assert!(matches!(err, ChainError::Config(_)));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let err = EngineConfig::from_toml_str("collector_capacity = 0").unwrap_err();
        assert!(matches!(err, ChainError::Config(_)));
        let err = EngineConfig::from_toml_str("fault_queue_depth = 0").unwrap_err();
        assert!(matches!(err, ChainError::Config(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = EngineConfig {
            telemetry_window: 16,
            log_dir: Some(dir.path().join("logs")),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(Some(dir.path().join("absent.toml")));
        assert_eq!(config, EngineConfig::default());
    }
}
