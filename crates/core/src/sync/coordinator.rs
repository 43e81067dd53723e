//! Sync coordinator
//!
//! Turns a user intent into repository calls, tracks the job through
//! `Idle -> Preparing -> Running -> terminal`, publishes progress on a
//! broadcast channel and owns cancellation of in-flight work.
//!
//! Cancel tokens form a tree: the coordinator's root token parents one
//! token per job, which parents the per-batch request tokens. Cancelling a
//! job aborts its requests without touching the coordinator; shutting the
//! coordinator down cancels everything.

use std::sync::Arc;

use parking_lot::Mutex;
use stockbridge_domain::{
    Ack, AsyncReceipt, BatchResult, BridgeError, JobProgress, MdmRow, ProgressEvent, Result,
    SourceItem, SyncKind, SyncNotification, SyncReport, SyncStage, SyncState,
};
use stockbridge_domain::constants::ALL_FILTER;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::inventory::batching::prepare_items;
use crate::inventory::ports::{BatchObserver, BatchTick, InventoryPort, PushContext};
use crate::source_map::SourceMap;

const EVENT_CAPACITY: usize = 64;

/// Message published to progress subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Progress(ProgressEvent),
    /// Exactly one per run, on its terminal state.
    Finished(SyncNotification),
}

/// Transient state of the running (or last) job.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub id: Uuid,
    pub kind: SyncKind,
    /// Resolved items of a `SELECTED` job.
    pub items: Vec<SourceItem>,
    /// Target of `ALL_FOR_SOURCE` and `MARK_CHANGED` jobs.
    pub source_code: Option<String>,
    pub progress: JobProgress,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct CoordinatorState {
    state: SyncState,
    job: Option<SyncJob>,
}

/// What a run ended with, before it becomes a report.
struct RunOutcome {
    state: SyncState,
    batch: Option<BatchResult>,
    receipt: Option<AsyncReceipt>,
    ack: Option<Ack>,
    error: Option<BridgeError>,
}

impl RunOutcome {
    fn failed(error: BridgeError) -> Self {
        let state = if error.is_cancelled() {
            SyncState::Cancelled
        } else {
            SyncState::Failed(error.kind())
        };
        Self { state, batch: None, receipt: None, ack: None, error: Some(error) }
    }

    fn with_batch(mut self, batch: BatchResult) -> Self {
        self.batch = Some(batch);
        self
    }
}

/// Coordinates sync jobs against an [`InventoryPort`].
pub struct SyncCoordinator {
    port: Arc<dyn InventoryPort>,
    source_map: Arc<SourceMap>,
    root: CancellationToken,
    inner: Arc<Mutex<CoordinatorState>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    pub fn new(port: Arc<dyn InventoryPort>, source_map: Arc<SourceMap>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            port,
            source_map,
            root: CancellationToken::new(),
            inner: Arc::new(Mutex::new(CoordinatorState { state: SyncState::Idle, job: None })),
            events,
        }
    }

    /// Subscribe to progress ticks and terminal notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    /// Snapshot of the running (or last finished) job.
    pub fn current_job(&self) -> Option<SyncJob> {
        self.inner.lock().job.clone()
    }

    /// Cancel the running job, if any. Returns whether a job was cancelled.
    ///
    /// Sub-batches already acknowledged stay applied at the catalog.
    pub fn cancel(&self) -> bool {
        let guard = self.inner.lock();
        match (&guard.job, guard.state.is_busy()) {
            (Some(job), true) => {
                info!(job_id = %job.id, kind = %job.kind, "cancelling sync job");
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel everything this coordinator ever started. Subsequent intents
    /// are cancelled immediately.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Return from a terminal state to `Idle`.
    pub fn acknowledge(&self) -> SyncState {
        let mut guard = self.inner.lock();
        if guard.state.is_terminal() {
            guard.state = SyncState::Idle;
        }
        guard.state
    }

    /// Push the selected rows (a snapshot taken at intent time).
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] when another job is running. Every other
    /// failure is reported through the returned [`SyncReport`].
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn sync_selected(&self, rows: Vec<MdmRow>) -> Result<SyncReport> {
        let (job_id, cancel) = self.begin(SyncKind::Selected, None)?;

        let prepared = prepare_items(rows, &self.source_map);
        if prepared.is_empty() {
            let dropped = prepared.dropped.len();
            warn!(%job_id, dropped, "no row of the selection can be pushed");
            let error = BridgeError::Validation(format!(
                "none of the selected rows can be pushed ({} dropped)",
                prepared.dropped.len()
            ));
            let batch = BatchResult { dropped: prepared.dropped, ..BatchResult::default() };
            return Ok(self.finish(job_id, RunOutcome::failed(error).with_batch(batch)));
        }

        let total = prepared.items.len();
        self.publish_progress(job_id, SyncStage::Preparing, 0, total, None);
        self.enter_running(job_id, total, |job| job.items.clone_from(&prepared.items));

        let observer = Arc::new(JobObserver {
            job_id,
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        });
        let ctx = PushContext::new(cancel).with_observer(observer);

        let outcome = match self.port.push_stock_batch(prepared.rows, &ctx).await {
            Ok(mut batch) => {
                let mut dropped = prepared.dropped;
                dropped.append(&mut batch.dropped);
                batch.dropped = dropped;
                Self::classify_batch(batch)
            }
            Err(err) => RunOutcome::failed(err),
        };

        Ok(self.finish(job_id, outcome))
    }

    /// Ask the gateway to push a whole source.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] for `"all"`, an empty code or a busy
    /// coordinator, [`BridgeError::UnknownSource`] for codes outside the
    /// source map. No HTTP request is made in these cases.
    #[instrument(skip(self))]
    pub async fn sync_all_for_source(&self, source_code: &str) -> Result<SyncReport> {
        let code = self.concrete_source(source_code, "whole-source sync")?;
        let (job_id, cancel) = self.begin(SyncKind::AllForSource, Some(code.clone()))?;
        self.enter_running(job_id, 1, |_| {});

        let outcome = match self.port.push_all_for_source(&code, &cancel).await {
            Ok(receipt) => RunOutcome {
                state: SyncState::Succeeded,
                batch: None,
                receipt: Some(receipt),
                ack: None,
                error: None,
            },
            Err(err) => RunOutcome::failed(err),
        };
        Ok(self.finish(job_id, outcome))
    }

    /// Flag every row of a source that differs from its last pushed state.
    ///
    /// # Errors
    ///
    /// Same guards as [`Self::sync_all_for_source`].
    #[instrument(skip(self))]
    pub async fn mark_stocks_changed(&self, source_code: &str) -> Result<SyncReport> {
        let code = self.concrete_source(source_code, "marking stocks as changed")?;
        let (job_id, cancel) = self.begin(SyncKind::MarkChanged, Some(code.clone()))?;
        self.enter_running(job_id, 1, |_| {});

        let outcome = match self.port.mark_stocks_changed(&code, &cancel).await {
            Ok(ack) => RunOutcome {
                state: SyncState::Succeeded,
                batch: None,
                receipt: None,
                ack: Some(ack),
                error: None,
            },
            Err(err) => RunOutcome::failed(err),
        };
        Ok(self.finish(job_id, outcome))
    }

    fn concrete_source(&self, source_code: &str, what: &str) -> Result<String> {
        let code = source_code.trim();
        if code.is_empty() || code.eq_ignore_ascii_case(ALL_FILTER) {
            return Err(BridgeError::Validation(format!(
                "{what} requires a concrete source, got '{source_code}'"
            )));
        }
        self.source_map.mapping_by_code_source(code)?;
        Ok(code.to_string())
    }

    fn classify_batch(batch: BatchResult) -> RunOutcome {
        if let Some(error) = batch.fatal.clone() {
            return RunOutcome::failed(error).with_batch(batch);
        }
        let (state, error) = if batch.cancelled {
            (SyncState::Cancelled, Some(BridgeError::Cancelled))
        } else if batch.has_failures() {
            let error = BridgeError::PartialBatchFailure {
                submitted: batch.submitted,
                failed: batch.failed.len(),
            };
            (SyncState::PartiallyFailed, Some(error))
        } else {
            (SyncState::Succeeded, None)
        };
        RunOutcome { state, batch: Some(batch), receipt: None, ack: None, error }
    }

    fn begin(
        &self,
        kind: SyncKind,
        source_code: Option<String>,
    ) -> Result<(Uuid, CancellationToken)> {
        let mut guard = self.inner.lock();
        if guard.state.is_busy() {
            return Err(BridgeError::Validation("a sync job is already running".into()));
        }
        if guard.state.is_terminal() {
            debug!(previous = ?guard.state, "implicitly acknowledging previous job");
        }

        let job = SyncJob {
            id: Uuid::new_v4(),
            kind,
            items: Vec::new(),
            source_code,
            progress: JobProgress::default(),
            cancel: self.root.child_token(),
        };
        let handle = (job.id, job.cancel.clone());
        info!(job_id = %job.id, %kind, "sync job started");
        guard.state = SyncState::Preparing;
        guard.job = Some(job);
        Ok(handle)
    }

    fn enter_running(&self, job_id: Uuid, total: usize, update: impl FnOnce(&mut SyncJob)) {
        let mut guard = self.inner.lock();
        if let Some(job) = guard.job.as_mut().filter(|job| job.id == job_id) {
            job.progress.total = total;
            update(job);
        }
        guard.state = SyncState::Running;
    }

    fn publish_progress(
        &self,
        job_id: Uuid,
        stage: SyncStage,
        current: usize,
        total: usize,
        last_message: Option<String>,
    ) {
        let event = ProgressEvent { job_id, stage, current, total, last_message };
        let _ = self.events.send(SyncEvent::Progress(event));
    }

    fn finish(&self, job_id: Uuid, outcome: RunOutcome) -> SyncReport {
        let (kind, source_code, progress) = {
            let mut guard = self.inner.lock();
            guard.state = outcome.state;
            match guard.job.as_mut().filter(|job| job.id == job_id) {
                Some(job) => {
                    if outcome.state == SyncState::Succeeded && job.kind != SyncKind::Selected {
                        job.progress.completed = job.progress.total;
                    }
                    if let Some(error) = &outcome.error {
                        job.progress.last_error.get_or_insert_with(|| error.message());
                    }
                    (job.kind, job.source_code.clone(), job.progress.clone())
                }
                None => (SyncKind::Selected, None, JobProgress::default()),
            }
        };

        let stage = match outcome.state {
            SyncState::Succeeded | SyncState::PartiallyFailed => Some(SyncStage::Completed),
            SyncState::Failed(_) if progress.total > 0 => Some(SyncStage::Failed),
            _ => None,
        };
        if let Some(stage) = stage {
            let last = progress.last_error.clone();
            self.publish_progress(job_id, stage, progress.completed, progress.total, last);
        }

        let message = Self::notification_message(kind, source_code.as_deref(), &outcome, &progress);
        let silent = matches!(outcome.error, Some(BridgeError::NotFound(_)));
        info!(%job_id, %kind, state = ?outcome.state, %message, "sync job finished");
        let _ = self.events.send(SyncEvent::Finished(SyncNotification {
            job_id,
            kind,
            state: outcome.state,
            message,
            silent,
        }));

        SyncReport {
            job_id,
            kind,
            state: outcome.state,
            progress,
            batch: outcome.batch,
            receipt: outcome.receipt,
            ack: outcome.ack,
            error: outcome.error,
        }
    }

    fn notification_message(
        kind: SyncKind,
        source_code: Option<&str>,
        outcome: &RunOutcome,
        progress: &JobProgress,
    ) -> String {
        let source = source_code.unwrap_or_default();
        match (outcome.state, kind) {
            (SyncState::Succeeded, SyncKind::Selected) => {
                let succeeded = outcome.batch.as_ref().map_or(0, |b| b.succeeded);
                format!("{succeeded} items synced to the catalog")
            }
            (SyncState::Succeeded, SyncKind::AllForSource) => {
                format!("Whole-source sync requested for source {source}")
            }
            (SyncState::Succeeded, SyncKind::MarkChanged) => {
                format!("Stocks of source {source} marked as changed")
            }
            (SyncState::Cancelled, _) => {
                format!("Sync cancelled after {} of {} items", progress.completed, progress.total)
            }
            _ => outcome
                .error
                .as_ref()
                .map_or_else(|| "Sync finished".to_string(), BridgeError::to_string),
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Feeds sub-batch ticks into the job progress and the event channel.
struct JobObserver {
    job_id: Uuid,
    inner: Arc<Mutex<CoordinatorState>>,
    events: broadcast::Sender<SyncEvent>,
}

impl BatchObserver for JobObserver {
    fn on_batch_resolved(&self, tick: &BatchTick) {
        {
            let mut guard = self.inner.lock();
            if let Some(job) = guard.job.as_mut().filter(|job| job.id == self.job_id) {
                job.progress.completed = tick.completed_items;
                job.progress.total = tick.total_items;
                if tick.error.is_some() {
                    job.progress.last_error.clone_from(&tick.error);
                }
            }
        }
        let message = tick.error.clone().or_else(|| {
            Some(format!("batch {} acknowledged ({} items)", tick.index + 1, tick.items))
        });
        let _ = self.events.send(SyncEvent::Progress(ProgressEvent {
            job_id: self.job_id,
            stage: SyncStage::Uploading,
            current: tick.completed_items,
            total: tick.total_items,
            last_message: message,
        }));
    }
}
