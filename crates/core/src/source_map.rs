//! Static lookup between MDM sources and catalog sources
//!
//! The table is loaded once and never mutated. A code that is not in the
//! table is reported as [`BridgeError::UnknownSource`]; callers decide what to
//! do with the row (the push path drops it).

use std::collections::{BTreeSet, HashMap, HashSet};

use stockbridge_domain::{BridgeError, Result, SourceMapping};

/// `(codeSource, label, branch, catalogSource)`. An empty catalog source
/// marks an MDM location that has no counterpart in the catalog.
const BUILTIN_SOURCES: &[(&str, &str, u32, &str)] = &[
    ("1", "Entrepot central", 16, "warehouse_central"),
    ("7", "Paris", 16, "warehouse_paris"),
    ("8", "Lyon", 16, "warehouse_lyon"),
    ("9", "Showroom Paris", 16, ""),
    ("12", "Marseille", 21, "warehouse_marseille"),
    ("14", "Bordeaux", 21, "warehouse_bordeaux"),
    ("20", "Lille", 30, "warehouse_lille"),
    ("23", "Nantes", 30, "warehouse_nantes"),
];

/// Immutable source-code map.
#[derive(Debug, Clone)]
pub struct SourceMap {
    entries: Vec<SourceMapping>,
    by_code: HashMap<String, usize>,
}

impl SourceMap {
    /// The table shipped with the bridge.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_SOURCES
            .iter()
            .map(|&(code, label, branch, catalog)| SourceMapping::new(code, label, branch, catalog))
            .collect::<Vec<_>>();
        let by_code =
            entries.iter().enumerate().map(|(idx, m)| (m.code_source.clone(), idx)).collect();
        Self { entries, by_code }
    }

    /// Builds a map from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when `codeSource` or `(branch, source)`
    /// is not unique.
    pub fn from_entries(entries: Vec<SourceMapping>) -> Result<Self> {
        let mut by_code = HashMap::with_capacity(entries.len());
        let mut branch_sources = HashSet::with_capacity(entries.len());

        for (idx, mapping) in entries.iter().enumerate() {
            if by_code.insert(mapping.code_source.clone(), idx).is_some() {
                return Err(BridgeError::Config(format!(
                    "duplicate codeSource in source map: {}",
                    mapping.code_source
                )));
            }
            if !branch_sources.insert((mapping.branch, mapping.source.as_str())) {
                return Err(BridgeError::Config(format!(
                    "duplicate source '{}' for branch {}",
                    mapping.source, mapping.branch
                )));
            }
        }

        Ok(Self { entries, by_code })
    }

    /// # Errors
    ///
    /// [`BridgeError::UnknownSource`] when `code` is not in the table.
    pub fn mapping_by_code_source(&self, code: &str) -> Result<&SourceMapping> {
        self.by_code
            .get(code.trim())
            .map(|idx| &self.entries[*idx])
            .ok_or_else(|| BridgeError::UnknownSource(code.to_string()))
    }

    /// Catalog-side code for an MDM source code.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownSource`] for codes outside the table and
    /// [`BridgeError::MappingMissing`] for known sources without a catalog
    /// counterpart.
    pub fn catalog_source_for(&self, code: &str) -> Result<&str> {
        let mapping = self.mapping_by_code_source(code)?;
        let catalog = mapping.catalog_source.trim();
        if catalog.is_empty() {
            return Err(BridgeError::MappingMissing(code.to_string()));
        }
        Ok(catalog)
    }

    /// Branches covering the given source codes.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownSource`] for the first code not in the table.
    pub fn branches_of<'a, I>(&self, codes: I) -> Result<BTreeSet<u32>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        codes.into_iter().map(|code| self.mapping_by_code_source(code).map(|m| m.branch)).collect()
    }

    /// Sources located in `branch`, in table order.
    pub fn sources_in_branch(&self, branch: u32) -> impl Iterator<Item = &SourceMapping> {
        self.entries.iter().filter(move |m| m.branch == branch)
    }

    #[must_use]
    pub fn entries(&self) -> &[SourceMapping] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::builtin()
    }
}
