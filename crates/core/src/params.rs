//! Catalog search parameter builder
//!
//! Turns a [`SearchQuery`] into the flat `searchCriteria[...]` encoding the
//! catalog search API expects. Output is a `BTreeMap`, so identical queries
//! always produce the same key order (and therefore the same cache key).
//!
//! Any pair whose key or value still carries a template placeholder is
//! dropped with a warning instead of being sent.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use stockbridge_domain::constants::{DEFAULT_CONDITION_TYPE, DEFAULT_FIELD_NAME, TEMPLATE_SENTINELS};
use stockbridge_domain::{FilterSpec, SearchQuery};
use tracing::warn;

const PAGE_SIZE_KEY: &str = "searchCriteria[pageSize]";
const CURRENT_PAGE_KEY: &str = "searchCriteria[currentPage]";
const FIELD_NAME_KEY: &str = "fieldName";

/// Primitive query-string value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    /// Converts a JSON primitive. Null, arrays and objects yield `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_i64().map(Self::Int).or_else(|| n.as_f64().map(Self::Float)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Flat, ordered parameter set.
pub type Params = BTreeMap<String, ParamValue>;

/// Whether `text` looks like an unrendered template placeholder.
#[must_use]
pub fn is_template_leak(text: &str) -> bool {
    TEMPLATE_SENTINELS.iter().any(|sentinel| text.contains(sentinel))
        || (text.contains("fieldName") && text.contains('%'))
}

/// Inserts `key = value` unless either side leaks a placeholder.
///
/// Returns whether the pair was kept.
pub fn insert_checked(params: &mut Params, key: String, value: ParamValue) -> bool {
    let leaked = is_template_leak(&key) || value.as_text().is_some_and(is_template_leak);
    if leaked {
        warn!(key = %key, "dropping search parameter carrying a template placeholder");
        return false;
    }
    params.insert(key, value);
    true
}

fn valid_field(field: &str) -> bool {
    if field.trim().is_empty() {
        warn!("dropping search criterion with an empty field");
        return false;
    }
    if is_template_leak(field) {
        warn!(field = %field, "dropping search criterion whose field is a template placeholder");
        return false;
    }
    true
}

/// Encodes `query` for the catalog search API.
///
/// `field_name_hint` is used when the query carries neither a `fieldName`
/// nor a page size; without one of the two the catalog answers with a
/// misleading 400.
#[must_use]
pub fn build_search_params(query: &SearchQuery, field_name_hint: Option<&str>) -> Params {
    let mut params = Params::new();

    if let Some(pagination) = query.pagination {
        params.insert(PAGE_SIZE_KEY.to_string(), pagination.page_size.into());
        params.insert(CURRENT_PAGE_KEY.to_string(), pagination.current_page.into());
    }

    let mut sort_index = 0usize;
    for sort in &query.sort {
        if !valid_field(&sort.field) {
            continue;
        }
        let prefix = format!("searchCriteria[sortOrders][{sort_index}]");
        insert_checked(&mut params, format!("{prefix}[field]"), sort.field.as_str().into());
        insert_checked(&mut params, format!("{prefix}[direction]"), sort.direction.wire().into());
        sort_index += 1;
    }

    let mut group_index = 0usize;
    for group in &query.filters {
        if encode_filter_group(&mut params, group_index, group) {
            group_index += 1;
        }
    }

    if let Some(field_name) = query.field_name.as_deref() {
        if valid_field(field_name) {
            insert_checked(&mut params, FIELD_NAME_KEY.to_string(), field_name.into());
        }
    }

    flatten_object(&mut params, None, &query.extras);

    if !params.contains_key(FIELD_NAME_KEY) && !params.contains_key(PAGE_SIZE_KEY) {
        let default = field_name_hint
            .filter(|hint| !hint.trim().is_empty() && !is_template_leak(hint))
            .unwrap_or(DEFAULT_FIELD_NAME);
        params.insert(FIELD_NAME_KEY.to_string(), default.into());
    }

    params
}

/// Encodes one filter group; returns whether anything was emitted.
fn encode_filter_group(params: &mut Params, group_index: usize, group: &[FilterSpec]) -> bool {
    let mut filter_index = 0usize;
    for filter in group {
        if !valid_field(&filter.field) {
            continue;
        }
        let Some(value) = ParamValue::from_json(&filter.value) else {
            warn!(field = %filter.field, "dropping filter whose value is not a primitive");
            continue;
        };
        if value.as_text().is_some_and(is_template_leak) {
            warn!(field = %filter.field, "dropping filter whose value is a template placeholder");
            continue;
        }

        let condition = filter
            .condition_type
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CONDITION_TYPE);
        let prefix =
            format!("searchCriteria[filterGroups][{group_index}][filters][{filter_index}]");
        insert_checked(params, format!("{prefix}[field]"), filter.field.as_str().into());
        insert_checked(params, format!("{prefix}[value]"), value);
        insert_checked(params, format!("{prefix}[conditionType]"), condition.into());
        filter_index += 1;
    }
    filter_index > 0
}

fn flatten_object(params: &mut Params, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let full_key = match prefix {
            Some(prefix) => format!("{prefix}[{key}]"),
            None => key.clone(),
        };
        flatten_value(params, full_key, value);
    }
}

fn flatten_value(params: &mut Params, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(object) => flatten_object(params, Some(&key), object),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                flatten_value(params, format!("{key}[{idx}]"), item);
            }
        }
        primitive => {
            if let Some(value) = ParamValue::from_json(primitive) {
                insert_checked(params, key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stockbridge_domain::{Pagination, SortDirection, SortSpec};

    use super::*;

    fn no_leaks(params: &Params) -> bool {
        params.iter().all(|(key, value)| {
            let rendered = value.to_string();
            TEMPLATE_SENTINELS
                .iter()
                .all(|sentinel| !key.contains(sentinel) && !rendered.contains(sentinel))
        })
    }

    #[test]
    fn encodes_pagination_sort_and_filters() {
        let query = SearchQuery {
            pagination: Some(Pagination { page_size: 50, current_page: 2 }),
            sort: vec![SortSpec::new("sku", SortDirection::Desc)],
            filters: vec![vec![
                FilterSpec::equals("source_code", "warehouse_paris"),
                FilterSpec {
                    field: "quantity".into(),
                    value: json!(0),
                    condition_type: Some("gt".into()),
                },
            ]],
            ..SearchQuery::default()
        };

        let params = build_search_params(&query, None);

        assert_eq!(params["searchCriteria[pageSize]"], ParamValue::Int(50));
        assert_eq!(params["searchCriteria[currentPage]"], ParamValue::Int(2));
        assert_eq!(params["searchCriteria[sortOrders][0][field]"], "sku".into());
        assert_eq!(params["searchCriteria[sortOrders][0][direction]"], "DESC".into());
        assert_eq!(
            params["searchCriteria[filterGroups][0][filters][0][conditionType]"],
            "eq".into()
        );
        assert_eq!(
            params["searchCriteria[filterGroups][0][filters][1][value]"],
            ParamValue::Int(0)
        );
        assert_eq!(
            params["searchCriteria[filterGroups][0][filters][1][conditionType]"],
            "gt".into()
        );
        assert!(!params.contains_key("fieldName"), "page size present, no fieldName injected");
    }

    #[test]
    fn default_direction_is_ascending() {
        let query: SearchQuery =
            serde_json::from_value(json!({"sort": [{"field": "name"}]})).unwrap();
        let params = build_search_params(&query, None);
        assert_eq!(params["searchCriteria[sortOrders][0][direction]"], "ASC".into());
    }

    #[test]
    fn injects_field_name_from_hint_or_default() {
        let bare = SearchQuery::default();
        assert_eq!(build_search_params(&bare, None)["fieldName"], "name".into());
        assert_eq!(build_search_params(&bare, Some("sku"))["fieldName"], "sku".into());
        assert_eq!(build_search_params(&bare, Some("%fieldName"))["fieldName"], "name".into());
    }

    #[test]
    fn drops_placeholder_fields_and_values() {
        let query = SearchQuery {
            sort: vec![SortSpec::new("${sortField}", SortDirection::Asc)],
            filters: vec![
                vec![FilterSpec::equals("%fieldName", "x")],
                vec![FilterSpec::equals("sku", "%{value}")],
                vec![FilterSpec::equals("sku", "A-1")],
            ],
            field_name: Some("%fieldName%".into()),
            extras: json!({"store": {"code": "${store}"}, "raw": "%fieldName"})
                .as_object()
                .cloned()
                .unwrap(),
            ..SearchQuery::default()
        };

        let params = build_search_params(&query, None);

        assert!(no_leaks(&params), "leaked placeholder in {params:?}");
        assert!(!params.contains_key("searchCriteria[sortOrders][0][field]"));
        // the only surviving group is re-indexed from zero
        assert_eq!(params["searchCriteria[filterGroups][0][filters][0][value]"], "A-1".into());
        assert!(!params.contains_key("searchCriteria[filterGroups][1][filters][0][field]"));
        assert!(!params.contains_key("store[code]"));
        assert!(!params.contains_key("raw"));
        assert_eq!(params["fieldName"], "name".into());
    }

    #[test]
    fn drops_empty_fields() {
        let query = SearchQuery {
            filters: vec![vec![FilterSpec::equals("  ", "x")]],
            ..SearchQuery::default()
        };
        let params = build_search_params(&query, None);
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("fieldName"));
    }

    #[test]
    fn flattens_nested_extras_with_brackets() {
        let query = SearchQuery {
            extras: json!({
                "store": {"id": 3, "flags": {"active": true}},
                "codes": ["a", "b"],
                "skip": null
            })
            .as_object()
            .cloned()
            .unwrap(),
            ..SearchQuery::default()
        };

        let params = build_search_params(&query, None);

        assert_eq!(params["store[id]"], ParamValue::Int(3));
        assert_eq!(params["store[flags][active]"], ParamValue::Bool(true));
        assert_eq!(params["codes[1]"], "b".into());
        assert!(!params.contains_key("skip"));
    }

    #[test]
    fn output_is_stable_across_calls() {
        let query = SearchQuery {
            filters: vec![vec![FilterSpec::equals("b", 1)], vec![FilterSpec::equals("a", 2)]],
            extras: json!({"z": 1, "m": 2}).as_object().cloned().unwrap(),
            ..SearchQuery::default()
        };
        let first: Vec<String> = build_search_params(&query, None).into_keys().collect();
        let second: Vec<String> = build_search_params(&query, None).into_keys().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_template_leak("%fieldName"));
        assert!(is_template_leak("a${b}"));
        assert!(is_template_leak("%{x}"));
        assert!(is_template_leak("fieldName%"));
        assert!(!is_template_leak("fieldName"));
        assert!(!is_template_leak("100%"));
    }
}
