//! Row preparation and sub-batch partitioning
//!
//! `prepare_items` maps MDM rows to catalog source items, dropping rows
//! that cannot be sent and collapsing duplicate `(sku, catalog source)`
//! pairs so that each pair is mutated by at most one sub-batch.

use std::collections::HashMap;

use stockbridge_domain::{DropReason, DroppedRow, MdmRow, SourceItem};
use tracing::warn;

use crate::source_map::SourceMap;

/// Result of mapping rows to catalog items.
///
/// `rows[i]` is the MDM row `items[i]` was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedItems {
    pub items: Vec<SourceItem>,
    pub rows: Vec<MdmRow>,
    pub dropped: Vec<DroppedRow>,
}

impl PreparedItems {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Whether `candidate` should replace `current` for the same pair.
///
/// The later `lastUpdatedAt` wins; a missing timestamp loses to a present
/// one, and on a tie the row selected last wins.
fn supersedes(candidate: &MdmRow, current: &MdmRow) -> bool {
    match (candidate.last_updated_at, current.last_updated_at) {
        (Some(new), Some(old)) => new >= old,
        (None, Some(_)) => false,
        (Some(_) | None, None) => true,
    }
}

/// Maps rows through `map`, dropping and collapsing as needed.
///
/// Items keep the position at which their pair first appeared.
#[must_use]
pub fn prepare_items(rows: Vec<MdmRow>, map: &SourceMap) -> PreparedItems {
    let mut kept: Vec<(MdmRow, String)> = Vec::with_capacity(rows.len());
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut dropped = Vec::new();

    for row in rows {
        let sku = row.sku.trim().to_string();
        if sku.is_empty() {
            warn!(source_code = %row.source_code, "dropping row with empty sku");
            dropped.push(DroppedRow { row, reason: DropReason::EmptySku });
            continue;
        }

        let catalog = match map.catalog_source_for(&row.source_code) {
            Ok(catalog) => catalog.to_string(),
            Err(err) => {
                warn!(
                    sku = %sku,
                    source_code = %row.source_code,
                    error = %err,
                    "dropping row without catalog source"
                );
                dropped.push(DroppedRow { row, reason: DropReason::MappingMissing });
                continue;
            }
        };

        let pair = (sku, catalog.clone());
        if let Some(&slot) = slots.get(&pair) {
            let loser = if supersedes(&row, &kept[slot].0) {
                std::mem::replace(&mut kept[slot].0, row)
            } else {
                row
            };
            dropped.push(DroppedRow { row: loser, reason: DropReason::Superseded });
        } else {
            slots.insert(pair, kept.len());
            kept.push((row, catalog));
        }
    }

    let items = kept
        .iter()
        .map(|(row, catalog)| {
            SourceItem::from_stock(row.sku.trim(), catalog.as_str(), row.qty_stock)
        })
        .collect();
    let rows = kept.into_iter().map(|(row, _)| row).collect();

    PreparedItems { items, rows, dropped }
}

/// Splits items into sub-batches of at most `batch_size`.
///
/// Items are grouped by catalog source (in first-appearance order) when
/// that does not need more sub-batches than plain chunking; otherwise they
/// are chunked in input order.
#[must_use]
pub fn partition(items: Vec<SourceItem>, batch_size: usize) -> Vec<Vec<SourceItem>> {
    let size = batch_size.max(1);
    if items.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in &items {
        let count = counts.entry(item.source_code.as_str()).or_insert(0);
        if *count == 0 {
            order.push(item.source_code.clone());
        }
        *count += 1;
    }

    let plain = items.len().div_ceil(size);
    let grouped: usize = counts.values().map(|count| count.div_ceil(size)).sum();

    if grouped > plain {
        return items.chunks(size).map(<[SourceItem]>::to_vec).collect();
    }

    let mut groups: HashMap<String, Vec<SourceItem>> = HashMap::with_capacity(order.len());
    for item in items {
        groups.entry(item.source_code.clone()).or_default().push(item);
    }

    let mut batches = Vec::with_capacity(grouped);
    for source in order {
        let Some(group) = groups.remove(&source) else { continue };
        let mut rest = group;
        while rest.len() > size {
            let tail = rest.split_off(size);
            batches.push(rest);
            rest = tail;
        }
        batches.push(rest);
    }
    batches
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn row(sku: &str, source: &str, qty: i64) -> MdmRow {
        MdmRow::new(sku, source, qty)
    }

    fn item(sku: &str, source: &str) -> SourceItem {
        SourceItem::from_stock(sku, source, 1)
    }

    fn prepare(rows: Vec<MdmRow>) -> PreparedItems {
        prepare_items(rows, &SourceMap::builtin())
    }

    fn paris_item(sku: &str, quantity: i64, status: u8) -> SourceItem {
        SourceItem { sku: sku.into(), source_code: "warehouse_paris".into(), quantity, status }
    }

    #[test]
    fn maps_clamps_and_derives_status() {
        let prepared = prepare(vec![row("A", "7", 3), row("B", "7", 0), row("C", "7", -2)]);

        assert!(prepared.dropped.is_empty());
        assert_eq!(
            prepared.items,
            vec![paris_item("A", 3, 1), paris_item("B", 0, 0), paris_item("C", 0, 0)]
        );
    }

    #[test]
    fn drops_unmapped_and_empty_sku_rows() {
        let input = vec![row("X", "999", 1), row("  ", "7", 4), row("Y", "9", 2), row("Z", "8", 1)];
        let prepared = prepare_items(input.clone(), &SourceMap::builtin());

        assert_eq!(prepared.items.len(), 1);
        assert_eq!(prepared.items[0].source_code, "warehouse_lyon");
        let reasons: Vec<_> = prepared.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![DropReason::MappingMissing, DropReason::EmptySku, DropReason::MappingMissing]
        );
        assert_eq!(prepared.items.len() + prepared.dropped.len(), input.len());
    }

    #[test]
    fn later_timestamp_wins_on_duplicate_pair() {
        let mut older = row("A", "7", 1);
        older.last_updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        let mut newer = row("A", "7", 9);
        newer.last_updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap());

        let prepared = prepare(vec![newer.clone(), row("B", "7", 1), older.clone()]);

        assert_eq!(prepared.items.len(), 2);
        assert_eq!(prepared.items[0].quantity, 9);
        assert_eq!(prepared.rows[0], newer);
        let superseded = DroppedRow { row: older, reason: DropReason::Superseded };
        assert_eq!(prepared.dropped, vec![superseded]);
    }

    #[test]
    fn same_sku_in_different_catalog_sources_is_not_a_duplicate() {
        let prepared = prepare(vec![row("A", "7", 1), row("A", "8", 1)]);
        assert_eq!(prepared.items.len(), 2);
        assert!(prepared.dropped.is_empty());
    }

    #[test]
    fn partition_respects_batch_size() {
        let items: Vec<_> =
            (0..250).map(|i| item(&format!("SKU-{i}"), "warehouse_paris")).collect();
        let batches = partition(items, 100);
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches[1][0].sku, "SKU-100");
    }

    #[test]
    fn partition_groups_by_source_when_free() {
        let items =
            vec![item("A", "paris"), item("B", "lyon"), item("C", "paris"), item("D", "lyon")];
        let batches = partition(items, 2);
        let skus: Vec<Vec<&str>> =
            batches.iter().map(|b| b.iter().map(|i| i.sku.as_str()).collect()).collect();
        assert_eq!(skus, vec![vec!["A", "C"], vec!["B", "D"]]);
    }

    #[test]
    fn partition_falls_back_to_input_order_when_grouping_costs_batches() {
        let items = vec![item("A", "paris"), item("B", "lyon"), item("C", "nantes")];
        let batches = partition(items, 3);
        assert_eq!(batches.len(), 1);
        let skus: Vec<&str> = batches[0].iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["A", "B", "C"]);
    }

    #[test]
    fn partition_of_nothing_is_empty() {
        assert!(partition(Vec::new(), 100).is_empty());
        assert_eq!(partition(vec![item("A", "paris")], 0).len(), 1);
    }
}
