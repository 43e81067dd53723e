//! MDM gateway wire format
//!
//! The gateway is loose about types: numbers arrive as strings, the branch
//! is spelled three different ways and `changed` may be a number, a string
//! or a boolean. Everything is normalized here so the rest of the bridge
//! only ever sees [`MdmRow`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use stockbridge_domain::{BridgeError, MdmRow, Page, Result};
use tracing::warn;

const BRANCH_KEYS: [&str; 3] = ["branch", "Succursale", "succursale"];

/// Parse a `{ data: [...], totalCount }` listing.
///
/// # Errors
///
/// [`BridgeError::Internal`] when `data` is missing or not an array.
pub fn parse_page(body: &Value, page: u32, page_size: u32) -> Result<Page<MdmRow>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| BridgeError::Internal("MDM listing without a data array".into()))?;

    let rows: Vec<MdmRow> = data
        .iter()
        .filter_map(|item| match item.as_object() {
            Some(object) => Some(normalize_row(object)),
            None => {
                warn!(item = %item, "skipping non-object MDM row");
                None
            }
        })
        .collect();

    let total = body.get("totalCount").and_then(as_u64).unwrap_or(rows.len() as u64);
    Ok(Page { rows, total, page, page_size })
}

pub fn normalize_row(object: &Map<String, Value>) -> MdmRow {
    let branch = BRANCH_KEYS.iter().find_map(|key| object.get(*key)).and_then(as_u64).unwrap_or(0);

    MdmRow {
        sku: text(object, "sku"),
        jde_code: text(object, "jdeCode"),
        family_code: text(object, "familyCode"),
        product_type: text(object, "productType"),
        source_code: text(object, "sourceCode"),
        branch: u32::try_from(branch).unwrap_or(0),
        qty_stock: integer(object, "qtyStock").max(0),
        tariff: float(object, "tariff").max(0.0),
        qty_received: integer(object, "qtyReceived"),
        avg_sales: float(object, "avgSales"),
        last_updated_at: object.get("lastUpdatedAt").and_then(timestamp),
        last_synced_at: object.get("lastSyncedAt").and_then(timestamp),
        changed: object.get("changed").is_some_and(flag),
    }
}

fn text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn integer(object: &Map<String, Value>, key: &str) -> i64 {
    match object.get(key) {
        Some(Value::Number(n)) => {
            n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)).unwrap_or(0)
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float(object: &Map<String, Value>, key: &str) -> f64 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|i| i != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        _ => false,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}
