//! Process-wide catalog client

use std::sync::Arc;

use once_cell::sync::OnceCell;
use stockbridge_domain::{BridgeError, Result};

use super::client::CatalogClient;

static CLIENT: OnceCell<Arc<CatalogClient>> = OnceCell::new();

/// Install the process-wide client.
///
/// # Errors
///
/// [`BridgeError::Internal`] when a client is already installed.
pub fn install(client: CatalogClient) -> Result<Arc<CatalogClient>> {
    let client = Arc::new(client);
    CLIENT
        .set(Arc::clone(&client))
        .map_err(|_| BridgeError::Internal("catalog client already installed".into()))?;
    Ok(client)
}

/// The installed client, if any.
pub fn global() -> Option<Arc<CatalogClient>> {
    CLIENT.get().cloned()
}
