//! Source-code mapping entries

use serde::{Deserialize, Serialize};

/// Bridges an MDM source (identified by `code_source` and `branch`) to the
/// source code the catalog expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapping {
    pub code_source: String,
    pub source: String,
    pub branch: u32,
    pub catalog_source: String,
}

impl SourceMapping {
    #[must_use]
    pub fn new(
        code_source: impl Into<String>,
        source: impl Into<String>,
        branch: u32,
        catalog_source: impl Into<String>,
    ) -> Self {
        Self {
            code_source: code_source.into(),
            source: source.into(),
            branch,
            catalog_source: catalog_source.into(),
        }
    }
}
