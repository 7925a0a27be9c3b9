//! User settings persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ScanConfig, SettingsError};

/// Settings loaded from `config.toml`.
///
/// ```toml
/// data_file = "/home/me/inventory.json"
///
/// [scan]
/// timeout_ms = 20000
/// settle_delay_ms = 1000
/// require_enabled = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inventory data file. Falls back to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    /// Scan session tuning.
    pub scan: ScanConfig,
}

impl Settings {
    /// Get the default config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tagshelf").join("config.toml"))
    }

    /// Get the default inventory data path.
    pub fn default_data_file() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tagshelf")
            .join("inventory.json")
    }

    /// Load settings from `path`.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        let settings: Self = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings
            .scan
            .validate()
            .map_err(|message| SettingsError::InvalidConfig { message })?;
        Ok(settings)
    }

    /// Load settings from the default location, or return defaults when the
    /// file does not exist yet.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SettingsError::io(path, e))
    }

    /// Save settings to the default location.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Resolved inventory data path.
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(Self::default_data_file)
    }
}
