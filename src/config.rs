//! Configuration management for KDyn
//!
//! Settings are saved to and loaded from a platform-specific TOML file.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/kdyn/config.toml` |
//! | macOS | `~/Library/Application Support/kdyn/config.toml` |
//! | Windows | `%APPDATA%\kdyn\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use kdyn::Config;
//!
//! let mut config = Config::load().unwrap_or_default();
//! config.session.idle_timeout_sec = 30;
//! config.save().expect("Failed to save config");
//! ```

use crate::analytics::DEFAULT_BURST_THRESHOLD_MS;
use crate::recorder::RecorderLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "kdyn";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path to the config file, creating its directory if needed.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join(APP_DIR_NAME);

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Whether the user accepted timing-only collection
    pub consent_accepted: bool,
    /// Session defaults fed to the recorder
    pub session: SessionConfig,
    /// UI settings
    pub ui: UiConfig,
    /// Outbound summary notifications
    pub notifications: NotificationConfig,
}

/// Recording session defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix for generated session ids
    pub session_name: String,
    /// Stop automatically after this many seconds (0 = never)
    pub max_duration_sec: u64,
    /// Auto-pause after this many seconds without input (0 = never)
    pub idle_timeout_sec: u64,
    /// Presses closer than this belong to the same burst
    pub burst_threshold_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_name: "default".to_string(),
            max_duration_sec: 120,
            idle_timeout_sec: 10,
            burst_threshold_ms: DEFAULT_BURST_THRESHOLD_MS,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How often live metrics are recomputed (in Hz)
    pub refresh_rate_hz: u32,
    /// Color theme
    pub theme: Theme,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 4,
            theme: Theme::Dark,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
    HighContrast,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::HighContrast,
            Theme::HighContrast => Theme::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::HighContrast => "high contrast",
        }
    }
}

/// Discord / Telegram notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    pub use_discord: bool,
    pub discord_webhook: String,
    pub use_telegram: bool,
    pub telegram_token: String,
    pub telegram_chat_id: String,
}

impl NotificationConfig {
    /// True if at least one channel is enabled and filled in
    pub fn any_enabled(&self) -> bool {
        (self.use_discord && !self.discord_webhook.trim().is_empty())
            || (self.use_telegram
                && !self.telegram_token.trim().is_empty()
                && !self.telegram_chat_id.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Watchdog limits for the next session
    pub fn recorder_limits(&self) -> RecorderLimits {
        RecorderLimits::from_secs(self.session.max_duration_sec, self.session.idle_timeout_sec)
    }

    /// Interval between live metric refreshes
    pub fn refresh_interval(&self) -> Duration {
        let hz = self.ui.refresh_rate_hz.max(1) as u64;
        Duration::from_micros(1_000_000 / hz)
    }
}
