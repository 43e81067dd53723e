use std::time::Duration;

use stockbridge_domain::Result;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"inventory::list"`).
/// * `elapsed` - Duration the command execution took.
/// * `result` - What the command returned; failures are labelled with their
///   error kind.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution<T>(command: &str, elapsed: Duration, result: &Result<T>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(_) => info!(command, duration_ms, "command_execution_success"),
        Err(err) => {
            warn!(
                command,
                duration_ms,
                error_kind = %err.kind(),
                error = %err,
                "command_execution_failure"
            );
        }
    }
}
