//! In-memory `InventoryPort` for coordinator tests
//!
//! Pushes go through the real preparation, partitioning and sub-batch
//! pipeline; only the per-batch submission is scripted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use stockbridge_core::{
    partition, prepare_items, run_sub_batches, InventoryPort, PipelineOptions, PushContext,
    SourceMap,
};
use stockbridge_domain::{
    Ack, AsyncReceipt, BatchResult, BridgeError, ListQuery, MdmRow, Page, Result as DomainResult,
    SourceItem,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct MockInventoryPort {
    rows: Arc<Vec<MdmRow>>,
    source_map: Arc<SourceMap>,
    batch_size: usize,
    options: PipelineOptions,
    batch_errors: Arc<HashMap<usize, BridgeError>>,
    source_error: Option<BridgeError>,
    submitted: Arc<Mutex<Vec<Vec<SourceItem>>>>,
    source_calls: Arc<AtomicUsize>,
}

impl Default for MockInventoryPort {
    fn default() -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            source_map: Arc::new(SourceMap::builtin()),
            batch_size: 100,
            options: PipelineOptions::default(),
            batch_errors: Arc::new(HashMap::new()),
            source_error: None,
            submitted: Arc::new(Mutex::new(Vec::new())),
            source_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockInventoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<MdmRow>) -> Self {
        self.rows = Arc::new(rows);
        self
    }

    pub fn with_batching(mut self, batch_size: usize, options: PipelineOptions) -> Self {
        self.batch_size = batch_size;
        self.options = options;
        self
    }

    /// Make the sub-batch at `index` fail with `error`.
    pub fn failing_batch(mut self, index: usize, error: BridgeError) -> Self {
        Arc::make_mut(&mut self.batch_errors).insert(index, error);
        self
    }

    /// Make whole-source calls fail with `error`.
    pub fn failing_source_calls(mut self, error: BridgeError) -> Self {
        self.source_error = Some(error);
        self
    }

    /// Sub-batches that reached the submit step, in start order.
    pub fn submitted_batches(&self) -> Vec<Vec<SourceItem>> {
        self.submitted.lock().clone()
    }

    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryPort for MockInventoryPort {
    async fn list_changed(
        &self,
        query: &ListQuery,
        _cancel: &CancellationToken,
    ) -> DomainResult<Page<MdmRow>> {
        let rows: Vec<MdmRow> = self
            .rows
            .iter()
            .filter(|row| query.source_code.as_deref().map_or(true, |code| row.source_code == code))
            .filter(|row| !query.changed_only || row.changed)
            .cloned()
            .collect();
        let total = rows.len() as u64;
        Ok(Page { rows, total, page: query.page, page_size: query.page_size })
    }

    async fn push_stock_batch(
        &self,
        rows: Vec<MdmRow>,
        ctx: &PushContext,
    ) -> DomainResult<BatchResult> {
        let prepared = prepare_items(rows, &self.source_map);
        let batches = partition(prepared.items, self.batch_size);
        let mut result = run_sub_batches(batches, self.options, ctx, |index, items, _cancel| {
            self.submitted.lock().push(items);
            let outcome = self.batch_errors.get(&index).cloned();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                outcome.map_or(Ok(()), Err)
            }
        })
        .await;
        result.dropped = prepared.dropped;
        Ok(result)
    }

    async fn push_all_for_source(
        &self,
        source_code: &str,
        _cancel: &CancellationToken,
    ) -> DomainResult<AsyncReceipt> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.source_error {
            return Err(error.clone());
        }
        Ok(AsyncReceipt {
            acknowledged: true,
            source_code: source_code.to_string(),
            requested_at: Utc::now(),
        })
    }

    async fn mark_stocks_changed(
        &self,
        source_code: &str,
        _cancel: &CancellationToken,
    ) -> DomainResult<Ack> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.source_error {
            return Err(error.clone());
        }
        Ok(Ack { acknowledged: true, source_code: source_code.to_string() })
    }
}
