//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use stockbridge_core::SourceMap;
use stockbridge_domain::{MdmRow, Settings};
use stockbridge_infra::{CatalogClient, HttpInventoryRepository};

/// Settings pointing at `gateway` with fast retries and no inter-batch pause.
pub fn settings_for(gateway: &str) -> Settings {
    Settings {
        gateway_url: gateway.to_string(),
        retry_attempts: 1,
        retry_delay_ms: 5,
        timeout_ms: 5_000,
        inter_batch_delay_ms: 0,
        ..Settings::default()
    }
}

/// Same as [`settings_for`] with the direct transport enabled on `catalog_root`.
pub fn direct_settings(catalog_root: &str, gateway: &str) -> Settings {
    Settings {
        direct_enabled: true,
        catalog_root: Some(catalog_root.to_string()),
        access_token: Some("test-token".into()),
        ..settings_for(gateway)
    }
}

/// URL of a local port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn client(settings: Settings) -> Arc<CatalogClient> {
    Arc::new(CatalogClient::new(settings).expect("catalog client"))
}

pub fn repository(client: &Arc<CatalogClient>) -> Arc<HttpInventoryRepository> {
    Arc::new(HttpInventoryRepository::new(Arc::clone(client), Arc::new(SourceMap::builtin())))
}

/// `count` Paris rows (`sourceCode` 7) named `SKU-0..count`.
pub fn paris_rows(count: usize) -> Vec<MdmRow> {
    (0..count).map(|i| MdmRow::new(format!("SKU-{i}"), "7", 4)).collect()
}
