//! Resolution of grid row keys against a snapshot

use std::collections::{HashMap, HashSet};

use stockbridge_domain::{MdmRow, RowKey};

/// Rows resolved for a `SELECTED` intent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Resolved rows, in key order, each at most once.
    pub rows: Vec<MdmRow>,
    /// Keys absent from the snapshot.
    pub unknown: Vec<RowKey>,
}

/// Resolves `keys` against the grid snapshot taken at intent time.
///
/// Later filter changes do not affect an existing selection: the snapshot
/// is the only source of truth.
#[must_use]
pub fn select_rows(snapshot: &[MdmRow], keys: &[RowKey]) -> Selection {
    let index: HashMap<RowKey, &MdmRow> = snapshot.iter().map(|row| (row.key(), row)).collect();
    let mut seen = HashSet::with_capacity(keys.len());
    let mut selection = Selection::default();

    for key in keys {
        if !seen.insert(key) {
            continue;
        }
        match index.get(key) {
            Some(row) => selection.rows.push((*row).clone()),
            None => selection.unknown.push(key.clone()),
        }
    }
    selection
}
