//! Shared fixtures for app integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use stockbridge_app::AppContext;
use stockbridge_domain::Settings;

pub fn settings_for(gateway: &str) -> Settings {
    Settings {
        gateway_url: gateway.to_string(),
        retry_attempts: 0,
        retry_delay_ms: 5,
        inter_batch_delay_ms: 0,
        ..Settings::default()
    }
}

pub fn context(settings: Settings) -> AppContext {
    AppContext::new(settings).expect("app context")
}

/// MDM listing body with one row per `(sku, sourceCode, qtyStock)`.
pub fn listing(rows: &[(&str, &str, i64)]) -> Value {
    let data: Vec<Value> = rows
        .iter()
        .map(|(sku, source, qty)| {
            json!({
                "sku": sku,
                "sourceCode": source,
                "succursale": 16,
                "qtyStock": qty,
                "changed": 1
            })
        })
        .collect();
    json!({ "data": data, "totalCount": rows.len() })
}
