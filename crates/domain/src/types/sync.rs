//! Sync job outcomes, progress and batch accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BridgeError, ErrorKind};
use crate::impl_wire_name;
use crate::types::inventory::MdmRow;

/// What the user asked the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncKind {
    Selected,
    AllForSource,
    MarkChanged,
}

impl_wire_name!(SyncKind {
    Selected => "selected",
    AllForSource => "all_for_source",
    MarkChanged => "mark_changed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Preparing,
    Uploading,
    Completed,
    Failed,
}

impl_wire_name!(SyncStage {
    Preparing => "preparing",
    Uploading => "uploading",
    Completed => "completed",
    Failed => "failed",
});

/// Coordinator lifecycle.
///
/// `Succeeded`, `PartiallyFailed`, `Cancelled` and `Failed` are terminal and
/// return to `Idle` on acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Preparing,
    Running,
    Succeeded,
    PartiallyFailed,
    Cancelled,
    Failed(ErrorKind),
}

impl SyncState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallyFailed | Self::Cancelled | Self::Failed(_))
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Preparing | Self::Running)
    }
}

/// Why a row never reached the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The row's source code has no usable catalog source.
    MappingMissing,
    EmptySku,
    /// Another row for the same `(sku, catalog source)` pair was newer.
    Superseded,
}

impl_wire_name!(DropReason {
    MappingMissing => "mapping_missing",
    EmptySku => "empty_sku",
    Superseded => "superseded",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub row: MdmRow,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub sku: String,
    pub source_code: String,
    pub error: String,
}

/// Per-call accounting of a `push_stock_batch`.
///
/// `submitted + dropped.len() + skipped` always equals the number of input
/// rows. `skipped` counts items that were prepared but never sent because
/// the run was cancelled first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedItem>,
    pub dropped: Vec<DroppedRow>,
    pub skipped: usize,
    /// Indexes (in submission order) of sub-batches the catalog accepted.
    pub acknowledged_batches: Vec<usize>,
    pub cancelled: bool,
    /// Error that halted the run after the batches above were accounted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<BridgeError>,
}

impl BatchResult {
    #[must_use]
    pub fn accounted(&self) -> usize {
        self.submitted + self.dropped.len() + self.skipped
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Acknowledgement of a server-side whole-source job. It says nothing
/// about completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncReceipt {
    pub acknowledged: bool,
    pub source_code: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub acknowledged: bool,
    pub source_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub completed: usize,
    pub total: usize,
    pub last_error: Option<String>,
}

/// Progress tick published while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub stage: SyncStage,
    pub current: usize,
    pub total: usize,
    pub last_message: Option<String>,
}

/// The single user-facing notification of a run's terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNotification {
    pub job_id: Uuid,
    pub kind: SyncKind,
    pub state: SyncState,
    pub message: String,
    /// Set for outcomes the surface layer should not show (404s).
    pub silent: bool,
}

/// Everything known about a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub job_id: Uuid,
    pub kind: SyncKind,
    pub state: SyncState,
    pub progress: JobProgress,
    pub batch: Option<BatchResult>,
    pub receipt: Option<AsyncReceipt>,
    pub ack: Option<Ack>,
    pub error: Option<BridgeError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_busy_states() {
        assert!(SyncState::Succeeded.is_terminal());
        assert!(SyncState::Failed(ErrorKind::Validation).is_terminal());
        assert!(!SyncState::Running.is_terminal());
        assert!(SyncState::Preparing.is_busy());
        assert!(!SyncState::Idle.is_busy());
    }

    #[test]
    fn failed_state_serializes_its_kind() {
        let json = serde_json::to_value(SyncState::Failed(ErrorKind::Auth)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "error": "auth"}));
    }

    #[test]
    fn drop_reason_serializes_as_wire_name() {
        for reason in [DropReason::MappingMissing, DropReason::EmptySku, DropReason::Superseded] {
            assert_eq!(serde_json::to_value(reason).unwrap(), reason.as_str());
        }
    }

    #[test]
    fn accounted_covers_every_bucket() {
        let result = BatchResult {
            submitted: 3,
            dropped: vec![DroppedRow {
                row: MdmRow::new("X", "999", 1),
                reason: DropReason::MappingMissing,
            }],
            skipped: 2,
            ..BatchResult::default()
        };
        assert_eq!(result.accounted(), 6);
    }
}
