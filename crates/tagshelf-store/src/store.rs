//! Inventory records over a key-value backend.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tagshelf_core::{InventoryItem, ItemDraft, ItemPatch, TagId};

use crate::{KeyValueBackend, StoreError};

/// Prefix that namespaces inventory records in the backend.
pub const KEY_PREFIX: &str = "inventory_";

/// Inventory records keyed by tag id.
#[derive(Debug)]
pub struct InventoryStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> InventoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the backend back.
    pub fn into_inner(self) -> B {
        self.backend
    }

    /// Look up the record for `tag_id`.
    pub fn get(&self, tag_id: &TagId) -> Result<Option<InventoryItem>, StoreError> {
        let key = record_key(tag_id);
        self.backend
            .get(&key)?
            .map(|value| decode(&key, tag_id, value))
            .transpose()
    }

    /// Whether a record exists for `tag_id`.
    pub fn contains(&self, tag_id: &TagId) -> Result<bool, StoreError> {
        Ok(self.backend.get(&record_key(tag_id))?.is_some())
    }

    /// Insert or replace the record for `item.tag_id`.
    pub fn put(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let value = serde_json::to_value(item)?;
        self.backend.set(&record_key(&item.tag_id), value)?;
        tracing::debug!(target: "store", tag = %item.tag_id, "saved item");
        Ok(())
    }

    /// Delete the record for `tag_id`. Returns whether it existed.
    pub fn delete(&mut self, tag_id: &TagId) -> Result<bool, StoreError> {
        let removed = self.backend.remove(&record_key(tag_id))?;
        if removed {
            tracing::debug!(target: "store", tag = %tag_id, "deleted item");
        }
        Ok(removed)
    }

    /// All records, sorted by name then tag id.
    ///
    /// Keys outside the inventory namespace are ignored.
    pub fn list_all(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let mut items = Vec::new();
        for key in self.backend.keys()? {
            let Some(raw_tag) = key.strip_prefix(KEY_PREFIX) else {
                continue;
            };
            let Ok(tag_id) = TagId::new(raw_tag) else {
                tracing::warn!(target: "store", key = %key, "skipping record with blank tag id");
                continue;
            };
            if let Some(value) = self.backend.get(&key)? {
                items.push(decode(&key, &tag_id, value)?);
            }
        }
        items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.tag_id.cmp(&b.tag_id))
        });
        Ok(items)
    }

    /// Create a record for a newly scanned tag.
    pub fn create(
        &mut self,
        tag_id: TagId,
        draft: ItemDraft,
        now: DateTime<Utc>,
    ) -> Result<InventoryItem, StoreError> {
        if self.contains(&tag_id)? {
            return Err(StoreError::AlreadyExists { tag_id });
        }
        let item = InventoryItem::create(tag_id, draft, now)?;
        self.put(&item)?;
        Ok(item)
    }

    /// Add `delta` units to an existing record (clamped at zero).
    pub fn adjust_quantity(
        &mut self,
        tag_id: &TagId,
        delta: i64,
        now: DateTime<Utc>,
    ) -> Result<InventoryItem, StoreError> {
        self.modify(tag_id, |item| {
            item.adjust_quantity(delta, now);
            Ok(())
        })
    }

    /// Apply a field edit to an existing record.
    pub fn edit(
        &mut self,
        tag_id: &TagId,
        patch: ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<InventoryItem, StoreError> {
        self.modify(tag_id, |item| item.apply(patch, now).map_err(StoreError::from))
    }

    fn modify(
        &mut self,
        tag_id: &TagId,
        change: impl FnOnce(&mut InventoryItem) -> Result<(), StoreError>,
    ) -> Result<InventoryItem, StoreError> {
        let mut item = self.get(tag_id)?.ok_or_else(|| StoreError::NotFound {
            tag_id: tag_id.clone(),
        })?;
        change(&mut item)?;
        self.put(&item)?;
        Ok(item)
    }
}

fn record_key(tag_id: &TagId) -> String {
    format!("{KEY_PREFIX}{tag_id}")
}

/// Decode a stored record. The tag id always comes from the key, which also
/// accepts records saved without a `tagId` field.
fn decode(key: &str, tag_id: &TagId, mut value: Value) -> Result<InventoryItem, StoreError> {
    if let Value::Object(map) = &mut value {
        map.insert("tagId".to_string(), Value::String(tag_id.to_string()));
    }
    serde_json::from_value(value).map_err(|source| StoreError::CorruptRecord {
        key: key.to_string(),
        source,
    })
}
