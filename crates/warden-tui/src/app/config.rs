//! TUI configuration persistence
//!
//! Saves and loads user preferences such as the Ledger app and lockout preset.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_core::pin::LockoutPreset;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// PIN record file name
const PIN_FILE_NAME: &str = "pin.json";

/// Configuration directory under ~/.config
const CONFIG_DIR_NAME: &str = "warden";

/// TUI configuration that persists across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// App the Ledger is asked to open when connecting
    #[serde(default = "default_ledger_app")]
    pub ledger_app: String,

    /// Lockout thresholds for failed PIN attempts
    #[serde(default)]
    pub lockout_preset: LockoutPreset,

    /// Lockout countdown refresh interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Where the PIN record lives (defaults to the config directory)
    #[serde(default)]
    pub pin_path: Option<PathBuf>,
}

fn default_ledger_app() -> String {
    "Ethereum".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            ledger_app: default_ledger_app(),
            lockout_preset: LockoutPreset::default(),
            tick_interval_ms: default_tick_interval_ms(),
            pin_path: None,
        }
    }
}

impl WardenConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        // Try XDG_CONFIG_HOME first, then fall back to ~/.config
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
        }

        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the full config file path
    pub fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from disk
    ///
    /// Returns default configuration if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_dir = Self::config_dir().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&config_dir.join(CONFIG_FILE_NAME))
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, contents).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Resolve the PIN record location
    pub fn pin_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.pin_path {
            Some(path) => Ok(path.clone()),
            None => Self::config_dir()
                .map(|d| d.join(PIN_FILE_NAME))
                .ok_or(ConfigError::NoConfigDir),
        }
    }

    /// Countdown refresh interval, never below 100ms
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(100))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}
