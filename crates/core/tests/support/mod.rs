//! Shared test helpers for `stockbridge-core` integration tests.

pub mod repositories;

use stockbridge_domain::MdmRow;

/// A row in the Paris source (`7`), mapped to `warehouse_paris`.
pub fn paris_row(sku: &str, qty: i64) -> MdmRow {
    MdmRow::new(sku, "7", qty)
}

/// `count` distinct Paris rows named `SKU-0..count`.
pub fn paris_rows(count: usize) -> Vec<MdmRow> {
    (0..count).map(|i| paris_row(&format!("SKU-{i}"), 5)).collect()
}
