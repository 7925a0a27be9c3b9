//! Error types for inventory records and settings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while creating or editing an inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// Tag identifier was blank.
    #[error("Tag id cannot be empty")]
    EmptyTagId,

    /// Item name was blank.
    #[error("Item name is required")]
    EmptyName,

    /// Quantity text was not a non-negative integer.
    #[error("Quantity must be a valid number: {input:?}")]
    InvalidQuantity { input: String },
}

/// Errors raised while loading or saving the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`crate::Settings`].
    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Scan section failed validation.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// No platform config directory is available.
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

impl SettingsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
