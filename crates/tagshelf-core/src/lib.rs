//! Core types and configuration for tagshelf.
//!
//! This crate provides the data model shared by the rest of the workspace:
//! tag identifiers, inventory records, the scan session configuration and
//! the user settings file.

mod config;
mod error;
mod item;
mod settings;
mod tag;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ItemError, SettingsError};
pub use item::{InventoryItem, ItemDraft, ItemPatch};
pub use settings::Settings;
pub use tag::TagId;
