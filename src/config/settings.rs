//! Application configuration

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::*;
use super::migration::migrate;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Serial link to the telemetry receiver
    #[serde(default)]
    pub link: LinkConfig,
    /// Persisted data log
    #[serde(default)]
    pub storage: StorageConfig,
    /// Registered composite frame layout id
    #[serde(default = "default_layout")]
    pub layout: String,
}

impl AppConfig {
    /// Load configuration from disk, or the defaults if there is no file yet
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "sigmundr", "sigmundr-telemetry")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&content)?;
        let config = serde_json::from_value(migrate(raw))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            link: LinkConfig::default(),
            storage: StorageConfig::default(),
            layout: default_layout(),
        }
    }
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Identification line the receiver sends after reset
    #[serde(default = "default_bonjour")]
    pub bonjour: String,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl LinkConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            bonjour: default_bonjour(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

/// Data log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving one CSV file per session
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Write the CSV log at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.link.bonjour, "TELEMETRY");
        assert_eq!(config.link.handshake_timeout(), Duration::from_secs(2));
        assert_eq!(config.link.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert!(config.storage.enabled);
        assert_eq!(config.layout, "sigmundr");
    }

    #[test]
    fn test_partial_file_loads_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"version": 2, "link": {"baud_rate": 57600}, "storage": {"enabled": false}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.link.baud_rate, 57_600);
        assert_eq!(config.link.bonjour, "TELEMETRY");
        assert!(!config.storage.enabled);
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.layout, "sigmundr");
    }

    #[test]
    fn test_save_creates_parent_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.link.bonjour = "HELLO".to_string();
        config.save_to_path(&path).unwrap();

        assert_eq!(AppConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load_from_path(&path).is_err());
    }
}
