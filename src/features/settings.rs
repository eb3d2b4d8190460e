//! Application settings persistence
//!
//! Handles saving and loading player preferences.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ApiSettings::base_url`]
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Catalogue API connection
    #[serde(default)]
    pub api: ApiSettings,
    /// Playback and preloading
    #[serde(default)]
    pub playback: PlaybackSettings,
    /// Swipe gesture tuning
    #[serde(default)]
    pub gesture: GestureSettings,
    /// Playback controls overlay
    #[serde(default)]
    pub controls: ControlsSettings,
    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Catalogue API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the shows API (no trailing path)
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Playback-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Completion ratio after which the next episode is preloaded
    #[serde(default = "default_preload_threshold")]
    pub preload_threshold: f64,
    /// Streaming URL template, `{playback_id}` is substituted
    #[serde(default = "default_stream_url_template")]
    pub stream_url_template: String,
    /// Start playback as soon as a newly loaded source is ready
    #[serde(default = "default_true")]
    pub auto_play: bool,
    /// Prime the previous episode in a hidden slot on activation
    #[serde(default = "default_true")]
    pub prime_previous: bool,
}

fn default_preload_threshold() -> f64 {
    0.8
}

fn default_stream_url_template() -> String {
    "https://stream.mux.com/{playback_id}.m3u8".to_string()
}

fn default_true() -> bool {
    true
}

/// Swipe gesture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSettings {
    /// Fraction of the viewport height a drag must cover to commit
    pub commit_ratio: f64,
    /// Release velocity (px/s) above which a flick commits regardless of distance
    pub fast_velocity: f64,
    /// Translation (px) below which the drag direction is left unchanged
    pub direction_deadzone: f64,
    /// Duration of the commit slide in milliseconds
    pub commit_duration_ms: u64,
}

impl GestureSettings {
    pub fn commit_duration(&self) -> Duration {
        Duration::from_millis(self.commit_duration_ms)
    }
}

/// Controls overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsSettings {
    /// Delay before controls hide again, in milliseconds
    pub hide_delay_ms: u64,
}

impl ControlsSettings {
    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    /// Database file path, defaults to the platform data directory
    pub database_path: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            preload_threshold: default_preload_threshold(),
            stream_url_template: default_stream_url_template(),
            auto_play: true,
            prime_previous: true,
        }
    }
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            commit_ratio: 0.25,
            fast_velocity: 600.0,
            direction_deadzone: 10.0,
            commit_duration_ms: 250,
        }
    }
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            hide_delay_ms: 3000,
        }
    }
}

impl StorageSettings {
    /// Resolved database location
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::utils::default_database_path)
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        crate::utils::project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found.
    ///
    /// `API_BASE_URL` in the environment wins over the file.
    pub fn load() -> Self {
        let mut settings = Self::file_path()
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(settings) => Some(settings),
                Err(SettingsError::Io(_)) => None,
                Err(e) => {
                    tracing::warn!("Ignoring settings at {:?}: {}", path, e);
                    None
                }
            })
            .unwrap_or_default();
        settings.apply_env(std::env::var(API_BASE_URL_ENV).ok());
        settings
    }

    fn apply_env(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
