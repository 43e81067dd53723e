//! Port interfaces for inventory operations

use std::sync::Arc;

use async_trait::async_trait;
use stockbridge_domain::{Ack, AsyncReceipt, BatchResult, ListQuery, MdmRow, Page, Result};
use tokio_util::sync::CancellationToken;

/// MDM and catalog operations the coordinator drives.
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Fetch one page of MDM rows, normalized.
    async fn list_changed(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Page<MdmRow>>;

    /// Map, partition and push rows to the catalog.
    ///
    /// Row-level problems end up in the returned [`BatchResult`]. A failure
    /// that makes further batches pointless (authentication) stops the push
    /// and is carried in [`BatchResult::fatal`], next to the batches that
    /// already landed.
    async fn push_stock_batch(&self, rows: Vec<MdmRow>, ctx: &PushContext) -> Result<BatchResult>;

    /// Ask the gateway to start a whole-source push; returns on acknowledgement.
    async fn push_all_for_source(
        &self,
        source_code: &str,
        cancel: &CancellationToken,
    ) -> Result<AsyncReceipt>;

    /// Flag every row of the source that differs from the last push.
    async fn mark_stocks_changed(
        &self,
        source_code: &str,
        cancel: &CancellationToken,
    ) -> Result<Ack>;
}

/// Resolution of one sub-batch, reported in acknowledgment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTick {
    /// Position of the sub-batch in submission order.
    pub index: usize,
    pub items: usize,
    /// Items resolved so far (acknowledged or failed), this one included.
    pub completed_items: usize,
    pub total_items: usize,
    pub error: Option<String>,
}

/// Receives a tick each time a sub-batch resolves.
pub trait BatchObserver: Send + Sync {
    fn on_batch_resolved(&self, tick: &BatchTick);
}

/// Per-call context of a push.
#[derive(Clone, Default)]
pub struct PushContext {
    pub cancel: CancellationToken,
    pub observer: Option<Arc<dyn BatchObserver>>,
}

impl PushContext {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, observer: None }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn notify(&self, tick: &BatchTick) {
        if let Some(observer) = &self.observer {
            observer.on_batch_resolved(tick);
        }
    }
}
