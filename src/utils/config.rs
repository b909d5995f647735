//! Configuration management for the signage player
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::utils::error::{IntoSignageError, Result, SignageError};

/// Highest volume the backend accepts
pub const MAX_VOLUME: u32 = 150;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video library configuration
    pub library: LibraryConfig,

    /// Playback engine configuration
    pub playback: PlaybackConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Video library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the video files
    pub video_dir: PathBuf,

    /// Persisted playlist location
    pub playlist_file: PathBuf,

    /// File extensions (lowercase, no dot) picked up by directory scans
    pub allowed_extensions: Vec<String>,
}

/// Playback engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Period of the schedule re-check, in seconds
    pub schedule_check_interval_secs: u64,

    /// Delay before the startup auto-play, in seconds
    pub autoplay_delay_secs: u64,

    /// Volume applied at startup (0 - 150)
    pub default_volume: u32,

    /// Simulated media length for the headless backend (None = never ends)
    pub headless_media_duration_secs: Option<u64>,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .map(|p| p.join("signage-player"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            video_dir: base.join("videos"),
            playlist_file: base.join("playlist.json"),
            allowed_extensions: ["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "ts", "m4v"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            schedule_check_interval_secs: 5,
            autoplay_delay_secs: 2,
            default_volume: 100,
            headless_media_duration_secs: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl LibraryConfig {
    /// Check whether a path has one of the allowed video extensions
    pub fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/signage-player/config.toml on Linux)
    /// 3. User config file (~/.config/signage-player/config.toml on Linux)
    /// 4. Environment variables (SIGNAGE_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::read_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::read_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from one explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing fields fall back to their defaults
    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .config_err(&format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents)
            .config_err(&format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("SIGNAGE_VIDEO_DIR") {
            self.library.video_dir = PathBuf::from(dir);
        }

        if let Ok(file) = std::env::var("SIGNAGE_PLAYLIST_FILE") {
            self.library.playlist_file = PathBuf::from(file);
        }

        if let Ok(volume) = std::env::var("SIGNAGE_VOLUME") {
            self.playback.default_volume = volume.parse()
                .map_err(|_| SignageError::Config("Invalid SIGNAGE_VOLUME".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("SIGNAGE_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.playback.schedule_check_interval_secs == 0 {
            return Err(SignageError::Config("Schedule check interval must be non-zero".to_string()));
        }

        if self.playback.default_volume > MAX_VOLUME {
            return Err(SignageError::Config(format!(
                "Default volume must be between 0 and {}",
                MAX_VOLUME
            )));
        }

        if self.library.allowed_extensions.is_empty() {
            return Err(SignageError::Config("At least one video extension must be allowed".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(SignageError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/signage-player/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("signage-player").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.playback.schedule_check_interval_secs, 5);
        assert_eq!(config.playback.autoplay_delay_secs, 2);
        assert_eq!(config.playback.default_volume, 100);
        assert!(config.library.allowed_extensions.contains(&"mp4".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.playback.schedule_check_interval_secs = 0;
        assert!(config.validate().is_err());

        config.playback.schedule_check_interval_secs = 5;
        config.playback.default_volume = 151;
        assert!(config.validate().is_err());

        config.playback.default_volume = 80;
        config.general.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[library]\nvideo_dir = \"/srv/videos\"\n\n[playback]\ndefault_volume = 60\n",
        )
        .unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.library.video_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.playback.default_volume, 60);
        assert_eq!(config.playback.schedule_check_interval_secs, 5);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_allowed_extensions() {
        let library = LibraryConfig::default();
        assert!(library.is_allowed(Path::new("promo.MP4")));
        assert!(library.is_allowed(Path::new("loop.webm")));
        assert!(!library.is_allowed(Path::new("notes.txt")));
        assert!(!library.is_allowed(Path::new("README")));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml).unwrap();

        assert_eq!(config.library.video_dir, deserialized.library.video_dir);
        assert_eq!(config.playback.default_volume, deserialized.playback.default_volume);
    }
}
