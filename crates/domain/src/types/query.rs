//! Query shapes for MDM listing and catalog search

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD};
use crate::impl_wire_name;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl_wire_name!(SortDirection {
    Asc => "asc",
    Desc => "desc",
});

impl SortDirection {
    /// Uppercase form used on the wire.
    #[must_use]
    pub const fn wire(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }
}

/// One filter; `value` is a JSON primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub field: String,
    pub value: Value,
    #[serde(default)]
    pub condition_type: Option<String>,
}

impl FilterSpec {
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), value: value.into(), condition_type: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_size: u32,
    pub current_page: u32,
}

/// Structured catalog search query.
///
/// Filter groups are AND-ed; filters inside a group are OR-ed by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub pagination: Option<Pagination>,
    pub sort: Vec<SortSpec>,
    pub filters: Vec<Vec<FilterSpec>>,
    pub field_name: Option<String>,
    /// Arbitrary extra parameters, flattened with bracket notation.
    pub extras: Map<String, Value>,
}

/// MDM listing query as issued by the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub branch: Option<u32>,
    /// A concrete source code, or `"all"`.
    pub source_code: Option<String>,
    pub changed_only: bool,
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<SortSpec>,
    pub filters: Vec<FilterSpec>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            branch: None,
            source_code: None,
            changed_only: false,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            filters: Vec::new(),
        }
    }
}

impl ListQuery {
    /// Sort applied when the caller supplies none.
    #[must_use]
    pub fn default_sort() -> SortSpec {
        SortSpec::new(DEFAULT_SORT_FIELD, SortDirection::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
