//! Bounded sub-batch pipeline
//!
//! Sub-batches are started in partition order with at most `concurrency` of
//! them in flight. The window only advances past the oldest unresolved
//! sub-batch, so batch `i` has resolved before batch `i + concurrency`
//! starts. Ticks go to the observer as batches resolve; the returned
//! accounting is in submission order.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use stockbridge_domain::{BatchResult, BridgeError, FailedItem, Result, SourceItem};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ports::{BatchTick, PushContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub concurrency: usize,
    /// Pause before every sub-batch after the first.
    pub inter_batch_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { concurrency: 1, inter_batch_delay: Duration::ZERO }
    }
}

#[derive(Debug)]
enum SubBatchOutcome {
    Acknowledged,
    Failed(BridgeError),
    /// Cancelled in flight: reported failed, not counted as progress.
    Aborted(BridgeError),
    Skipped,
}

impl SubBatchOutcome {
    /// Tick error of an outcome that counts as progress; `None` when the
    /// batch never resolved.
    fn tick_error(&self) -> Option<Option<String>> {
        match self {
            Self::Acknowledged => Some(None),
            Self::Failed(err) => Some(Some(err.message())),
            Self::Aborted(_) | Self::Skipped => None,
        }
    }
}

/// Errors after which no further sub-batch is worth sending.
const fn is_fatal(error: &BridgeError) -> bool {
    matches!(error, BridgeError::Auth(_))
}

/// Runs `submit` over every sub-batch.
///
/// `submit` receives the batch index, the items and a cancellation token
/// scoped to that batch.
///
/// The first fatal error (authentication) halts the run: batches not yet
/// started are never sent, and the error is carried in
/// [`BatchResult::fatal`] next to the accounting of the batches that did
/// land.
pub async fn run_sub_batches<F, Fut>(
    batches: Vec<Vec<SourceItem>>,
    options: PipelineOptions,
    ctx: &PushContext,
    submit: F,
) -> BatchResult
where
    F: Fn(usize, Vec<SourceItem>, CancellationToken) -> Fut + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    let total_items: usize = batches.iter().map(Vec::len).sum();
    let halt = ctx.cancel.child_token();
    let completed = AtomicUsize::new(0);
    let fatal: Mutex<Option<BridgeError>> = Mutex::new(None);

    let halt_ref = &halt;
    let completed_ref = &completed;
    let fatal_ref = &fatal;
    let submit_ref = &submit;

    let resolved: Vec<_> = stream::iter(batches.into_iter().enumerate())
        .map(move |(index, batch)| async move {
            let outcome = run_one(index, &batch, options, halt_ref, submit_ref, |err| {
                fatal_ref.lock().get_or_insert_with(|| err.clone());
                halt_ref.cancel();
            })
            .await;
            if let Some(error) = outcome.tick_error() {
                let items = batch.len();
                let done = completed_ref.fetch_add(items, Ordering::SeqCst) + items;
                ctx.notify(&BatchTick { index, items, completed_items: done, total_items, error });
            }
            (batch, outcome)
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut result = BatchResult::default();
    let mut interrupted = false;
    for (index, (batch, outcome)) in resolved.into_iter().enumerate() {
        match outcome {
            SubBatchOutcome::Acknowledged => {
                result.submitted += batch.len();
                result.succeeded += batch.len();
                result.acknowledged_batches.push(index);
            }
            SubBatchOutcome::Failed(err) | SubBatchOutcome::Aborted(err) => {
                interrupted |= err.is_cancelled();
                result.submitted += batch.len();
                let message = err.message();
                result.failed.extend(batch.into_iter().map(|item| FailedItem {
                    sku: item.sku,
                    source_code: item.source_code,
                    error: message.clone(),
                }));
            }
            SubBatchOutcome::Skipped => {
                interrupted = true;
                result.skipped += batch.len();
            }
        }
    }
    result.fatal = fatal.into_inner();
    result.cancelled = interrupted && ctx.cancel.is_cancelled();

    if let Some(err) = &result.fatal {
        warn!(
            error = %err,
            succeeded = result.succeeded,
            "push stopped after fatal sub-batch failure"
        );
    }
    info!(
        submitted = result.submitted,
        succeeded = result.succeeded,
        failed = result.failed.len(),
        skipped = result.skipped,
        cancelled = result.cancelled,
        "sub-batch pipeline finished"
    );
    result
}

async fn run_one<F, Fut>(
    index: usize,
    batch: &[SourceItem],
    options: PipelineOptions,
    halt: &CancellationToken,
    submit: &F,
    on_fatal: impl FnOnce(&BridgeError),
) -> SubBatchOutcome
where
    F: Fn(usize, Vec<SourceItem>, CancellationToken) -> Fut + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    if index > 0 && !options.inter_batch_delay.is_zero() {
        tokio::select! {
            () = halt.cancelled() => return SubBatchOutcome::Skipped,
            () = tokio::time::sleep(options.inter_batch_delay) => {}
        }
    }
    if halt.is_cancelled() {
        return SubBatchOutcome::Skipped;
    }

    debug!(batch = index, items = batch.len(), "submitting sub-batch");
    match submit(index, batch.to_vec(), halt.child_token()).await {
        Ok(()) => SubBatchOutcome::Acknowledged,
        Err(BridgeError::Cancelled) => {
            debug!(batch = index, "sub-batch aborted by cancellation");
            SubBatchOutcome::Aborted(BridgeError::Cancelled)
        }
        Err(err) => {
            warn!(batch = index, error = %err, "sub-batch failed");
            if is_fatal(&err) {
                on_fatal(&err);
            }
            SubBatchOutcome::Failed(err)
        }
    }
}
