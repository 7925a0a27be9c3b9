//! Inventory persistence, post-scan routing and reports for tagshelf.
//!
//! Records live in a flat key-value backend under keys of the form
//! `inventory_<tagId>`. [`InventoryStore`] owns that namespacing;
//! backends only move JSON values around.

mod backend;
mod error;
mod report;
mod route;
mod store;

pub use backend::{JsonFileBackend, KeyValueBackend, MemoryBackend};
pub use error::StoreError;
pub use report::{CategorySummary, InventoryReport, write_csv};
pub use route::{ScanRoute, resolve_route};
pub use store::{InventoryStore, KEY_PREFIX};

// Re-export core types for convenience
pub use tagshelf_core::{InventoryItem, ItemDraft, ItemPatch, TagId};
