//! Configuration file support for Pawdose.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/pawdose/config.toml`.

use crate::adherence::MAX_TREND_DAYS;
use crate::{Error, NotificationSettings, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Statistics window configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            trend_days: default_trend_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("pawdose")
}

fn default_trend_days() -> u32 {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the statistics views cannot use
    pub fn validate(&self) -> Result<()> {
        if self.stats.trend_days == 0 {
            return Err(Error::Config("stats.trend_days must be at least 1".into()));
        }
        if self.stats.trend_days > MAX_TREND_DAYS {
            return Err(Error::Config(format!(
                "stats.trend_days must be at most {MAX_TREND_DAYS}"
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("pawdose").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stats.trend_days, 7);
        assert!(config.notifications.sound);
        assert_eq!(config.notifications.snooze_minutes, 10);
        assert!(config.data.data_dir.ends_with("pawdose"));
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.stats.trend_days = 14;
        config.notifications.sound = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.stats.trend_days, 14);
        assert!(!loaded.notifications.sound);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[notifications]
snooze_minutes = 15
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.notifications.snooze_minutes, 15);
        assert!(config.notifications.sound); // default
        assert_eq!(config.stats.trend_days, 7); // default
    }

    #[test]
    fn test_zero_trend_window_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[stats]\ntrend_days = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_oversized_trend_window_rejected() {
        let mut config = Config::default();
        config.stats.trend_days = 200_000_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.stats.trend_days = MAX_TREND_DAYS;
        assert!(config.validate().is_ok());
    }
}
