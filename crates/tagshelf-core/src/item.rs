//! Inventory records bound to NFC tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemError, TagId};

/// One physical item bound to one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Tag this item is bound to. Never changes after creation.
    pub tag_id: TagId,
    /// Display name (never empty).
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Units on hand.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Where the item is kept.
    #[serde(default)]
    pub location: String,
    /// Grouping used by reports.
    #[serde(default)]
    pub category: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last changed.
    pub last_updated: DateTime<Utc>,
}

fn default_quantity() -> u32 {
    1
}

/// Field values submitted when creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub location: String,
    pub category: String,
}

impl Default for ItemDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            quantity: default_quantity(),
            location: String::new(),
            category: String::new(),
        }
    }
}

impl ItemDraft {
    /// Start a draft with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a quantity typed into a form field.
    pub fn parse_quantity(input: &str) -> Result<u32, ItemError> {
        input
            .trim()
            .parse::<u32>()
            .map_err(|_| ItemError::InvalidQuantity {
                input: input.to_string(),
            })
    }
}

/// A partial edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub location: Option<String>,
    pub category: Option<String>,
}

impl ItemPatch {
    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.location.is_none()
            && self.category.is_none()
    }
}

impl InventoryItem {
    /// Create a record for a freshly scanned tag.
    pub fn create(tag_id: TagId, draft: ItemDraft, now: DateTime<Utc>) -> Result<Self, ItemError> {
        let name = validate_name(&draft.name)?;
        Ok(Self {
            tag_id,
            name,
            description: draft.description.trim().to_string(),
            quantity: draft.quantity,
            location: draft.location.trim().to_string(),
            category: draft.category.trim().to_string(),
            created_at: now,
            last_updated: now,
        })
    }

    /// Add `delta` units (negative to remove), clamping at zero.
    pub fn adjust_quantity(&mut self, delta: i64, now: DateTime<Utc>) {
        let next = (i64::from(self.quantity) + delta).clamp(0, i64::from(u32::MAX));
        self.quantity = next as u32;
        self.last_updated = now;
    }

    /// Apply a field edit. The record is left untouched if validation fails.
    pub fn apply(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> Result<(), ItemError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(location) = patch.location {
            self.location = location.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_string();
        }
        self.last_updated = now;
        Ok(())
    }

    /// Description, or a placeholder when none was given.
    pub fn description_or_default(&self) -> &str {
        non_empty_or(&self.description, "No description provided")
    }

    /// Location, or a placeholder when none was given.
    pub fn location_or_default(&self) -> &str {
        non_empty_or(&self.location, "Not specified")
    }

    /// Category, or `Uncategorized`.
    pub fn category_or_default(&self) -> &str {
        non_empty_or(&self.category, "Uncategorized")
    }
}

fn validate_name(name: &str) -> Result<String, ItemError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ItemError::EmptyName);
    }
    Ok(name.to_string())
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
