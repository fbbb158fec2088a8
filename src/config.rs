//! Application configuration file support.
//!
//! User preferences and keybindings are persisted as JSON in the platform
//! config directory. This is separate from the labeling config, which defines
//! the keypoint schema and is loaded per session.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::AutoSaveManager;
use crate::keybindings::KeyBindings;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Persisted application settings, separate from the labeling config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Keybinding configuration
    #[serde(default)]
    pub keybindings: KeyBindings,
}

fn default_app_name() -> String {
    "posetag".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Save the current image's labels before switching images
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Labeling config loaded on startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schema_path: Option<PathBuf>,

    /// Workspace opened last time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_workspace: Option<PathBuf>,

    /// Seconds without edits before an idle auto-save
    #[serde(default = "default_debounce_secs")]
    pub auto_save_debounce_secs: u64,

    /// Minimum seconds between idle auto-saves
    #[serde(default = "default_interval_secs")]
    pub auto_save_interval_secs: u64,
}

fn default_debounce_secs() -> u64 {
    AutoSaveManager::DEFAULT_DEBOUNCE_DELAY.as_secs()
}

fn default_interval_secs() -> u64 {
    AutoSaveManager::DEFAULT_SAVE_INTERVAL.as_secs()
}

fn default_auto_save() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            auto_save: default_auto_save(),
            log_level: LogLevel::default(),
            last_schema_path: None,
            last_workspace: None,
            auto_save_debounce_secs: default_debounce_secs(),
            auto_save_interval_secs: default_interval_secs(),
        }
    }
}

impl UserPreferences {
    /// Auto-save manager configured from these preferences.
    pub fn auto_save_manager(&self) -> AutoSaveManager {
        AutoSaveManager::new(
            self.auto_save,
            Duration::from_secs(self.auto_save_debounce_secs),
            Duration::from_secs(self.auto_save_interval_secs),
        )
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        for (a, b) in config.keybindings.find_conflicts() {
            log::warn!("Keybinding conflict: {:?} and {:?} share a key", a, b);
        }

        Ok(config)
    }

    /// File name of the settings file.
    pub fn default_filename() -> &'static str {
        "posetag-config.json"
    }

    /// `<config dir>/posetag/posetag-config.json`, falling back to `~/.config`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("posetag").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("posetag")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load settings from [`AppConfig::default_path`], if present and readable.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load settings from `path`. Unreadable files are logged and skipped.
    pub fn load_from(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Write settings to [`AppConfig::default_path`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors reading or writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
