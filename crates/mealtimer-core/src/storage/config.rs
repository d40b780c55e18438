//! TOML-based application configuration.
//!
//! Stores user preferences for the session tick cadence and the alerting
//! collaborators. Configuration lives at `~/.config/mealtimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

use super::data_dir;

/// Session (tick loop) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// State-advance interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Notification collaborator configuration. The core only carries these
/// values; alert playback happens downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to a custom alert sound file (optional).
    #[serde(default)]
    pub alert_sound: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mealtimer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_tick_interval_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_sound: None,
        }
    }
}

impl Config {
    /// Path to the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mealtimer"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, falling back to defaults when the file is absent.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.session.tick_interval_ms, 500);
        assert!(config.notifications.enabled);
        assert!(config.notifications.alert_sound.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [session]
            tick_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.session.tick_interval_ms, 250);
        assert!(config.notifications.enabled);
    }
}
