//! Configuration module for lnsim-rs
//!
//! This module handles application configuration:
//! - IPC naming, timeout and log elision ([`IpcSettings`])
//! - Refresh cycle timing ([`PollSettings`])
//! - Chart layout and sizing constants ([`LayoutSettings`])
//!
//! # App Data Location
//!
//! Configuration is stored as TOML in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.lnsim.lnsim-rs/`
//! - **macOS**: `~/Library/Application Support/dev.lnsim.lnsim-rs/`
//! - **Windows**: `%APPDATA%\dev.lnsim.lnsim-rs\`
//!
//! # Example
//!
//! ```ignore
//! use lnsim_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.poll.interval_ms = 2_000;
//! config.save_default()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{LnSimError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.lnsim.lnsim-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Log directory name (under the app data dir)
pub const LOG_DIR: &str = "logs";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        LnSimError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            LnSimError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for rolling log files (None uses the app data dir)
    pub log_dir: Option<PathBuf>,

    /// IPC correlator settings
    pub ipc: IpcSettings,

    /// Refresh cycle settings
    pub poll: PollSettings,

    /// Chart layout constants
    pub layout: LayoutSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LnSimError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            LnSimError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load configuration from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LnSimError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| LnSimError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            LnSimError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Save configuration to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(CONFIG_FILE))
    }

    /// Resolve the log directory, falling back to the app data dir
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| app_data_dir().map(|p| p.join(LOG_DIR)))
    }
}
