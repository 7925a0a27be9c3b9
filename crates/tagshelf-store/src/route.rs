//! Where to go after a tag has been scanned.

use tagshelf_core::{InventoryItem, TagId};

use crate::{InventoryStore, KeyValueBackend, StoreError};

/// Next screen after a successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRoute {
    /// The tag is known: show its record.
    ItemDetails(InventoryItem),
    /// The tag is new: open the creation form.
    AddItem(TagId),
}

impl ScanRoute {
    pub fn tag_id(&self) -> &TagId {
        match self {
            Self::ItemDetails(item) => &item.tag_id,
            Self::AddItem(tag_id) => tag_id,
        }
    }
}

/// Decide where a scanned tag leads.
pub fn resolve_route<B: KeyValueBackend>(
    store: &InventoryStore<B>,
    tag_id: &TagId,
) -> Result<ScanRoute, StoreError> {
    Ok(match store.get(tag_id)? {
        Some(item) => ScanRoute::ItemDetails(item),
        None => ScanRoute::AddItem(tag_id.clone()),
    })
}
