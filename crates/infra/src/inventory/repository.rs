//! HTTP implementation of [`InventoryPort`]
//!
//! Listings and whole-source jobs go to the MDM gateway; stock pushes go to
//! the catalog through the resilient client (direct or proxy).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use stockbridge_core::params::insert_checked;
use stockbridge_core::{
    build_search_params, partition, prepare_items, run_sub_batches, InventoryPort, ParamValue,
    Params, PipelineOptions, PushContext, SourceMap,
};
use stockbridge_domain::constants::ALL_FILTER;
use stockbridge_domain::{
    Ack, AsyncReceipt, BatchResult, BridgeError, ListQuery, MdmRow, Page, Result, SearchQuery,
    SourceItem,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::http::{CatalogClient, HttpRequest};
use crate::mdm::parse_page;

const LIST_ENDPOINT: &str = "mdm/inventory";
const SYNC_ALL_ENDPOINT: &str = "mdm/inventory/sync-all-source";
const MARK_CHANGED_ENDPOINT: &str = "mdm/inventory/sync-stocks";
const SOURCE_ITEMS_ENDPOINT: &str = "inventory/source-items";

/// Cache key prefix of MDM listing pages.
const LISTING_CACHE_PREFIX: &str = "get|mdm/inventory|";
/// Cache key prefix of catalog source-item searches.
const SOURCE_ITEMS_CACHE_PREFIX: &str = "get|inventory/source-items|";

/// `fieldName` sent with searches that carry neither one nor a page size.
const SEARCH_FIELD_HINT: &str = "sku";

/// Query keys a caller filter may not override.
const RESERVED_KEYS: [&str; 7] =
    ["page", "pageSize", "sourceCode", "succursale", "sortField", "sortOrder", "changed"];

#[derive(Debug, Deserialize)]
struct AckBody {
    #[serde(default = "acknowledged_by_default")]
    acknowledged: bool,
}

const fn acknowledged_by_default() -> bool {
    true
}

pub struct HttpInventoryRepository {
    client: Arc<CatalogClient>,
    source_map: Arc<SourceMap>,
}

impl HttpInventoryRepository {
    pub fn new(client: Arc<CatalogClient>, source_map: Arc<SourceMap>) -> Self {
        Self { client, source_map }
    }

    pub fn client(&self) -> &Arc<CatalogClient> {
        &self.client
    }

    /// Catalog source items matching `query`.
    ///
    /// Used to check what the catalog currently holds for a SKU; the query
    /// is encoded with the catalog search-criteria builder.
    ///
    /// # Errors
    ///
    /// Client failures, or [`BridgeError::Internal`] for a body without an
    /// `items` array.
    #[instrument(skip(self, query, cancel))]
    pub async fn search_source_items(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Page<SourceItem>> {
        let params = build_search_params(query, Some(SEARCH_FIELD_HINT));
        let request =
            HttpRequest::get(SOURCE_ITEMS_ENDPOINT).with_params(params).with_cancel(cancel.clone());
        let response = self.client.execute(request).await?;
        parse_source_items(&response.body, query)
    }

    fn invalidate_listings(&self) {
        self.client.purge_cache(LISTING_CACHE_PREFIX);
    }

    fn concrete_source(source_code: &str) -> Result<&str> {
        let code = source_code.trim();
        if code.is_empty() || code.eq_ignore_ascii_case(ALL_FILTER) {
            return Err(BridgeError::Validation(format!(
                "a concrete source code is required, got '{source_code}'"
            )));
        }
        Ok(code)
    }

    async fn acknowledge(&self, request: HttpRequest, what: &str) -> Result<()> {
        let response = self.client.execute(request).await?;
        let body: AckBody = if response.body.is_null() {
            AckBody { acknowledged: true }
        } else {
            response.json()?
        };
        if !body.acknowledged {
            return Err(BridgeError::ServerError(format!("gateway did not acknowledge {what}")));
        }
        self.invalidate_listings();
        Ok(())
    }
}

/// Query string of an MDM listing.
pub fn list_params(query: &ListQuery) -> Params {
    let mut params = Params::new();
    params.insert("page".into(), ParamValue::from(query.page));
    params.insert("pageSize".into(), ParamValue::from(query.page_size));

    let source = query
        .source_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case(ALL_FILTER));
    match (source, query.branch) {
        (Some(code), _) => {
            params.insert("sourceCode".into(), ParamValue::from(code));
        }
        (None, Some(branch)) => {
            params.insert("succursale".into(), ParamValue::from(branch));
        }
        (None, None) => {}
    }

    let sort = query.sort.clone().unwrap_or_else(ListQuery::default_sort);
    params.insert("sortField".into(), ParamValue::from(sort.field));
    params.insert("sortOrder".into(), ParamValue::from(sort.direction.wire()));

    if query.changed_only {
        params.insert("changed".into(), ParamValue::Int(1));
    }

    for filter in &query.filters {
        if RESERVED_KEYS.contains(&filter.field.as_str()) {
            warn!(field = %filter.field, "ignoring filter on a reserved listing parameter");
            continue;
        }
        match ParamValue::from_json(&filter.value) {
            Some(value) => {
                insert_checked(&mut params, filter.field.clone(), value);
            }
            None => warn!(field = %filter.field, "ignoring filter with a non-scalar value"),
        }
    }
    params
}

/// Parse a catalog `{ items, total_count }` search result.
///
/// Quantities arrive as decimals and are rounded; items without a SKU or
/// source code are skipped.
fn parse_source_items(body: &Value, query: &SearchQuery) -> Result<Page<SourceItem>> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| BridgeError::Internal("catalog search response has no items array".into()))?;

    let rows: Vec<SourceItem> = items
        .iter()
        .filter_map(|item| {
            let sku = item.get("sku")?.as_str()?.trim();
            let source_code = item.get("source_code")?.as_str()?.trim();
            if sku.is_empty() || source_code.is_empty() {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let quantity =
                item.get("quantity").and_then(Value::as_f64).unwrap_or_default().round() as i64;
            let status = item
                .get("status")
                .and_then(Value::as_u64)
                .map_or(u8::from(quantity > 0), |s| u8::from(s > 0));
            Some(SourceItem {
                sku: sku.to_string(),
                source_code: source_code.to_string(),
                quantity,
                status,
            })
        })
        .collect();

    let total = body.get("total_count").and_then(Value::as_u64).unwrap_or(rows.len() as u64);
    let unpaged = (0, u32::try_from(rows.len()).unwrap_or(u32::MAX));
    let (page, page_size) =
        query.pagination.map_or(unpaged, |p| (p.current_page, p.page_size));
    Ok(Page { rows, total, page, page_size })
}

#[async_trait]
impl InventoryPort for HttpInventoryRepository {
    #[instrument(skip(self, query, cancel), fields(page = query.page, page_size = query.page_size))]
    async fn list_changed(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Page<MdmRow>> {
        let request = HttpRequest::get(LIST_ENDPOINT)
            .mdm()
            .with_params(list_params(query))
            .with_cancel(cancel.clone());
        let response = self.client.execute(request).await?;
        parse_page(&response.body, query.page, query.page_size)
    }

    #[instrument(skip(self, rows, ctx), fields(rows = rows.len()))]
    async fn push_stock_batch(&self, rows: Vec<MdmRow>, ctx: &PushContext) -> Result<BatchResult> {
        let settings = self.client.settings();
        let prepared = prepare_items(rows, &self.source_map);
        let batches = partition(prepared.items, settings.batch_size);
        let options = PipelineOptions {
            concurrency: settings.batch_concurrency,
            inter_batch_delay: settings.inter_batch_delay(),
        };
        info!(
            batches = batches.len(),
            dropped = prepared.dropped.len(),
            "pushing stock to the catalog"
        );

        let client = &self.client;
        let mut result = run_sub_batches(batches, options, ctx, |_, items, cancel| async move {
            let request = HttpRequest::post(SOURCE_ITEMS_ENDPOINT, json!({ "sourceItems": items }))
                .with_cancel(cancel);
            client.execute(request).await.map(|_| ())
        })
        .await;

        result.dropped = prepared.dropped;
        // Batches acknowledged before a fatal error still landed.
        if result.succeeded > 0 {
            self.invalidate_listings();
            self.client.purge_cache(SOURCE_ITEMS_CACHE_PREFIX);
        }
        Ok(result)
    }

    #[instrument(skip(self, cancel))]
    async fn push_all_for_source(
        &self,
        source_code: &str,
        cancel: &CancellationToken,
    ) -> Result<AsyncReceipt> {
        let code = Self::concrete_source(source_code)?;
        let requested_at = Utc::now();
        let request = HttpRequest::post(SYNC_ALL_ENDPOINT, json!({ "sourceCode": code }))
            .mdm()
            .with_cancel(cancel.clone());
        self.acknowledge(request, "the whole-source sync").await?;
        info!(source_code = code, "whole-source sync acknowledged");
        Ok(AsyncReceipt { acknowledged: true, source_code: code.to_string(), requested_at })
    }

    #[instrument(skip(self, cancel))]
    async fn mark_stocks_changed(
        &self,
        source_code: &str,
        cancel: &CancellationToken,
    ) -> Result<Ack> {
        let code = Self::concrete_source(source_code)?;
        let request = HttpRequest::get(MARK_CHANGED_ENDPOINT)
            .mdm()
            .no_cache()
            .param("sourceCode", code)
            .with_cancel(cancel.clone());
        self.acknowledge(request, "marking stocks as changed").await?;
        Ok(Ack { acknowledged: true, source_code: code.to_string() })
    }
}
