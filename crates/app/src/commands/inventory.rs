//! Grid listing and sync intents

use std::time::Instant;

use stockbridge_domain::{MdmRow, Page, Result, SourceItem, SyncReport};
use tracing::info;

use crate::utils::logging::log_command_execution;
use crate::{AppContext, GridFilter, SelectedSync};

pub async fn list_inventory(ctx: &AppContext, filter: GridFilter) -> Result<Page<MdmRow>> {
    let command_name = "inventory::list";
    let start = Instant::now();

    let result = ctx.list(filter).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

pub async fn catalog_stock(
    ctx: &AppContext,
    sku: &str,
    source_code: Option<&str>,
) -> Result<Page<SourceItem>> {
    let command_name = "inventory::catalog_stock";
    let start = Instant::now();

    let result = ctx.catalog_stock(sku, source_code).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

pub async fn sync_selected(ctx: &AppContext, keys: &[String]) -> Result<SelectedSync> {
    let command_name = "inventory::sync_selected";
    let start = Instant::now();
    info!(command = command_name, keys = keys.len(), "Starting selected sync");

    let result = ctx.sync_selected(keys).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

pub async fn sync_all_for_source(ctx: &AppContext, source_code: &str) -> Result<SyncReport> {
    let command_name = "inventory::sync_all_for_source";
    let start = Instant::now();
    info!(command = command_name, source_code, "Requesting whole-source sync");

    let result = ctx.sync_all_for_source(source_code).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

pub async fn mark_stocks_changed(ctx: &AppContext, source_code: &str) -> Result<SyncReport> {
    let command_name = "inventory::mark_stocks_changed";
    let start = Instant::now();

    let result = ctx.mark_stocks_changed(source_code).await;

    log_command_execution(command_name, start.elapsed(), &result);
    result
}

/// Returns whether a running sync was cancelled.
pub fn cancel_sync(ctx: &AppContext) -> bool {
    let cancelled = ctx.cancel();
    info!(command = "inventory::cancel", cancelled, "Cancel requested");
    cancelled
}
