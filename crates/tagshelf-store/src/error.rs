//! Error types for inventory storage.

use std::path::PathBuf;

use tagshelf_core::{ItemError, TagId};
use thiserror::Error;

/// Errors that can occur while reading or writing inventory records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON object.
    #[error("Corrupt data file {path}: {source}")]
    CorruptFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A stored record could not be decoded.
    #[error("Corrupt record {key}: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// No record for the tag.
    #[error("No item registered for tag {tag_id}")]
    NotFound { tag_id: TagId },

    /// A record already exists for the tag.
    #[error("Tag {tag_id} is already registered")]
    AlreadyExists { tag_id: TagId },

    /// Record failed validation.
    #[error(transparent)]
    Invalid(#[from] ItemError),

    /// CSV export failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
