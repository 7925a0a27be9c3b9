//! NFC tag identifiers.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::ItemError;

/// Unique identifier read from an NFC tag (usually the hex UID, e.g. `04A1B2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(CompactString);

impl TagId {
    /// Create a tag id, rejecting blank input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ItemError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ItemError::EmptyTagId);
        }
        Ok(Self(CompactString::from(trimmed)))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for TagId {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
