//! Inventory summary and CSV export.

use std::io::Write;

use chrono::SecondsFormat;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tagshelf_core::{InventoryItem, TagId};

use crate::StoreError;

/// CSV header row.
const CSV_HEADER: [&str; 6] = [
    "Name",
    "Description",
    "Quantity",
    "Location",
    "Category",
    "Last Updated",
];

/// Items sharing one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Category name (`Uncategorized` when blank).
    pub category: String,
    /// Number of records.
    pub count: usize,
    /// Sum of quantities.
    pub quantity: u64,
    /// Records in this category.
    pub tag_ids: Vec<TagId>,
}

/// Summary of the whole inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    /// Number of records.
    pub total_items: usize,
    /// Sum of all quantities.
    pub total_quantity: u64,
    /// Distinct non-blank categories.
    pub category_count: usize,
    /// Per-category breakdown, in first-seen order.
    pub categories: Vec<CategorySummary>,
}

impl InventoryReport {
    /// Build a report over `items`.
    pub fn build(items: &[InventoryItem]) -> Self {
        let mut by_category: IndexMap<&str, CategorySummary> = IndexMap::new();
        for item in items {
            let name = item.category_or_default();
            let summary = by_category
                .entry(name)
                .or_insert_with(|| CategorySummary {
                    category: name.to_string(),
                    count: 0,
                    quantity: 0,
                    tag_ids: Vec::new(),
                });
            summary.count += 1;
            summary.quantity += u64::from(item.quantity);
            summary.tag_ids.push(item.tag_id.clone());
        }

        Self {
            total_items: items.len(),
            total_quantity: items.iter().map(|item| u64::from(item.quantity)).sum(),
            category_count: items
                .iter()
                .map(|item| item.category.as_str())
                .filter(|category| !category.is_empty())
                .unique()
                .count(),
            categories: by_category.into_values().collect(),
        }
    }

    /// Whether the inventory is empty.
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }
}

/// Write `items` as CSV, one row per record.
pub fn write_csv<W: Write>(items: &[InventoryItem], writer: W) -> Result<(), StoreError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for item in items {
        csv.write_record([
            item.name.as_str(),
            item.description.as_str(),
            &item.quantity.to_string(),
            item.location.as_str(),
            item.category.as_str(),
            &item
                .last_updated
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ])?;
    }
    csv.flush().map_err(|e| StoreError::Csv(e.into()))?;
    Ok(())
}
