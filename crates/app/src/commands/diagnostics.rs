//! Transport probes and client counters

use std::time::Instant;

use serde::Serialize;
use stockbridge_domain::{MetricsSnapshot, Result, TransportKind};
use stockbridge_infra::ProbeReport;

use crate::utils::logging::log_command_execution;
use crate::AppContext;

/// Client status as reported by the `metrics` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub direct_enabled: bool,
    pub direct_configured: bool,
    pub gateway_url: String,
    pub metrics: MetricsSnapshot,
}

pub async fn probe_transport(ctx: &AppContext, transport: TransportKind) -> Result<ProbeReport> {
    let command_name = "diagnostics::probe";
    let start = Instant::now();

    let result = ctx.probe(transport).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

pub fn get_metrics(ctx: &AppContext) -> StatusReport {
    let settings = ctx.settings();
    StatusReport {
        direct_enabled: ctx.client.direct_enabled(),
        direct_configured: settings.direct_configured(),
        gateway_url: settings.gateway_url.clone(),
        metrics: ctx.metrics(),
    }
}

pub fn reset_metrics(ctx: &AppContext) {
    ctx.client.reset_metrics();
    tracing::info!(command = "diagnostics::reset_metrics", "Client metrics reset");
}
