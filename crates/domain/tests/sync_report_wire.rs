//! JSON shape of the reports printed by the CLI and sent to the grid.

use serde_json::json;
use stockbridge_domain::{
    BatchResult, BridgeError, DropReason, DroppedRow, ErrorKind, JobProgress, MdmRow, SyncKind,
    SyncReport, SyncState,
};
use uuid::Uuid;

fn report(state: SyncState, error: Option<BridgeError>) -> SyncReport {
    SyncReport {
        job_id: Uuid::nil(),
        kind: SyncKind::Selected,
        state,
        progress: JobProgress { completed: 100, total: 250, last_error: None },
        batch: None,
        receipt: None,
        ack: None,
        error,
    }
}

#[test]
fn failed_state_carries_its_error_kind() {
    let json = serde_json::to_value(report(
        SyncState::Failed(ErrorKind::Validation),
        Some(BridgeError::Validation("nothing to push".into())),
    ))
    .unwrap();

    assert_eq!(json["kind"], "SELECTED");
    assert_eq!(json["state"], json!({"state": "failed", "error": "validation"}));
    assert_eq!(json["error"], json!({"type": "Validation", "message": "nothing to push"}));
    assert_eq!(json["progress"], json!({"completed": 100, "total": 250, "lastError": null}));
}

#[test]
fn cancelled_report_round_trips() {
    let mut original = report(SyncState::Cancelled, Some(BridgeError::Cancelled));
    original.batch = Some(BatchResult {
        submitted: 100,
        succeeded: 100,
        skipped: 150,
        acknowledged_batches: vec![0],
        cancelled: true,
        ..BatchResult::default()
    });

    let text = serde_json::to_string(&original).unwrap();
    let parsed: SyncReport = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed, original);
    assert_eq!(parsed.batch.unwrap().accounted(), 250);
}

#[test]
fn dropped_rows_name_their_reason() {
    let dropped =
        DroppedRow { row: MdmRow::new("A100", "9", 3), reason: DropReason::MappingMissing };
    let json = serde_json::to_value(&dropped).unwrap();

    assert_eq!(json["reason"], "mapping_missing");
    assert_eq!(json["row"]["sku"], "A100");
}
