//! Application context - dependency injection container
//!
//! Owns the catalog client, the inventory repository and the sync
//! coordinator, and keeps the grid state the inbound commands work against:
//! the current filter and the rows of the last listing, which is the
//! snapshot a `SELECTED` intent resolves its keys against.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use stockbridge_core::{select_rows, InventoryPort, SourceMap, SyncCoordinator, SyncEvent};
use stockbridge_domain::constants::ALL_FILTER;
use stockbridge_domain::{
    BridgeError, FilterSpec, ListQuery, MdmRow, MetricsSnapshot, Page, Result, RowKey,
    SearchQuery, Settings, SortSpec, SourceItem, SyncReport, TransportKind,
};
use stockbridge_infra::{CatalogClient, HttpInventoryRepository, ProbeReport};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grid filter as the UI sends it.
///
/// `branch` and `source_code` are strings so that `"all"` can be expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridFilter {
    pub branch: String,
    pub source_code: String,
    pub changed_only: bool,
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<SortSpec>,
    pub filters: Vec<FilterSpec>,
}

impl Default for GridFilter {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl GridFilter {
    /// First page of the configured default branch and source.
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = ListQuery::default();
        Self {
            branch: settings.default_branch.clone(),
            source_code: settings.default_source_filter.clone(),
            changed_only: false,
            page: defaults.page,
            page_size: defaults.page_size,
            sort: None,
            filters: Vec::new(),
        }
    }

    /// Listing query of this filter.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] when the branch is neither `"all"` nor a
    /// branch number.
    pub fn to_query(&self) -> Result<ListQuery> {
        let branch = match concrete(&self.branch) {
            None => None,
            Some(branch) => Some(branch.parse::<u32>().map_err(|_| {
                BridgeError::Validation(format!("invalid branch filter '{branch}'"))
            })?),
        };
        Ok(ListQuery {
            branch,
            source_code: concrete(&self.source_code).map(str::to_string),
            changed_only: self.changed_only,
            page: self.page,
            page_size: self.page_size,
            sort: self.sort.clone(),
            filters: self.filters.clone(),
        })
    }

    /// Branch and source, the part of the filter that defines which rows a
    /// running sync belongs to.
    fn scope(&self) -> (Option<&str>, Option<&str>) {
        (concrete(&self.branch), concrete(&self.source_code))
    }
}

fn concrete(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case(ALL_FILTER)).then_some(value)
}

/// Outcome of a `SELECTED` intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSync {
    pub report: SyncReport,
    /// Keys that were not part of the grid snapshot.
    pub unknown_keys: Vec<String>,
}

#[derive(Debug, Default)]
struct GridState {
    filter: Option<GridFilter>,
    rows: Vec<MdmRow>,
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub client: Arc<CatalogClient>,
    pub repository: Arc<HttpInventoryRepository>,
    pub coordinator: Arc<SyncCoordinator>,
    pub source_map: Arc<SourceMap>,
    grid: RwLock<GridState>,
    listing: Mutex<CancellationToken>,
}

impl AppContext {
    /// Build a context with its own client.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] for invalid settings.
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self::with_client(Arc::new(CatalogClient::new(settings)?)))
    }

    /// Build a context around an existing (typically process-wide) client.
    pub fn with_client(client: Arc<CatalogClient>) -> Self {
        let source_map = Arc::new(SourceMap::builtin());
        let repository =
            Arc::new(HttpInventoryRepository::new(Arc::clone(&client), Arc::clone(&source_map)));
        let port: Arc<dyn InventoryPort> = repository.clone();
        let coordinator = Arc::new(SyncCoordinator::new(port, Arc::clone(&source_map)));
        info!(
            sources = source_map.len(),
            direct_enabled = client.direct_enabled(),
            "application context ready"
        );

        Self {
            client,
            repository,
            coordinator,
            source_map,
            grid: RwLock::new(GridState::default()),
            listing: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.client.settings()
    }

    /// Filter the grid starts with.
    pub fn default_filter(&self) -> GridFilter {
        GridFilter::from_settings(&self.settings())
    }

    /// Fetch one page of the grid and keep it as the selection snapshot.
    ///
    /// # Errors
    ///
    /// Invalid filters and repository failures.
    pub async fn list(&self, filter: GridFilter) -> Result<Page<MdmRow>> {
        let query = filter.to_query()?;
        self.set_filter(&filter);
        let cancel = self.listing.lock().clone();

        let page = self.repository.list_changed(&query, &cancel).await?;
        self.grid.write().rows.clone_from(&page.rows);
        debug!(rows = page.rows.len(), total = page.total, "grid snapshot refreshed");
        Ok(page)
    }

    /// Record the grid filter.
    ///
    /// Moving to another branch or source cancels the running sync and any
    /// listing in flight, and empties the snapshot. Returns whether that
    /// happened.
    pub fn set_filter(&self, filter: &GridFilter) -> bool {
        let moved = {
            let mut grid = self.grid.write();
            let moved =
                grid.filter.as_ref().is_some_and(|previous| previous.scope() != filter.scope());
            if moved {
                grid.rows.clear();
            }
            grid.filter = Some(filter.clone());
            moved
        };
        if moved {
            self.cancel_running("grid filter changed");
        }
        moved
    }

    /// Rows of the last listing.
    pub fn grid_rows(&self) -> Vec<MdmRow> {
        self.grid.read().rows.clone()
    }

    /// Push the rows behind `keys` (`{sourceCode}-{sku}`).
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] for malformed keys or a busy coordinator.
    pub async fn sync_selected(&self, keys: &[String]) -> Result<SelectedSync> {
        let keys = keys.iter().map(|key| key.parse::<RowKey>()).collect::<Result<Vec<_>>>()?;
        let selection = select_rows(&self.grid.read().rows, &keys);
        if !selection.unknown.is_empty() {
            warn!(unknown = selection.unknown.len(), "selected keys are not in the grid snapshot");
        }

        let report = self.coordinator.sync_selected(selection.rows).await?;
        let unknown_keys = selection.unknown.iter().map(ToString::to_string).collect();
        Ok(SelectedSync { report, unknown_keys })
    }

    /// # Errors
    ///
    /// See [`SyncCoordinator::sync_all_for_source`].
    pub async fn sync_all_for_source(&self, source_code: &str) -> Result<SyncReport> {
        self.coordinator.sync_all_for_source(source_code).await
    }

    /// # Errors
    ///
    /// See [`SyncCoordinator::mark_stocks_changed`].
    pub async fn mark_stocks_changed(&self, source_code: &str) -> Result<SyncReport> {
        self.coordinator.mark_stocks_changed(source_code).await
    }

    /// What the catalog holds for `sku`, optionally restricted to the
    /// catalog source of one MDM source code.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] for an empty SKU,
    /// [`BridgeError::UnknownSource`] or [`BridgeError::MappingMissing`] for
    /// a source without a catalog counterpart, and client failures.
    pub async fn catalog_stock(
        &self,
        sku: &str,
        source_code: Option<&str>,
    ) -> Result<Page<SourceItem>> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(BridgeError::Validation("a SKU is required".into()));
        }

        let mut query = SearchQuery {
            filters: vec![vec![FilterSpec::equals("sku", sku)]],
            ..SearchQuery::default()
        };
        if let Some(code) = source_code.and_then(concrete) {
            let catalog_source = self.source_map.catalog_source_for(code)?;
            query.filters.push(vec![FilterSpec::equals("source_code", catalog_source)]);
        }

        let cancel = self.listing.lock().clone();
        self.repository.search_source_items(&query, &cancel).await
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<SyncEvent> {
        self.coordinator.subscribe()
    }

    /// Cancel the running sync, if any.
    pub fn cancel(&self) -> bool {
        self.coordinator.cancel()
    }

    /// Switch the catalog transport. A switch cancels running work.
    pub fn set_direct_enabled(&self, enabled: bool) -> bool {
        let switched = self.client.set_direct_enabled(enabled);
        if switched {
            self.cancel_running("catalog transport switched");
        }
        switched
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics()
    }

    /// # Errors
    ///
    /// [`BridgeError::Config`] when probing an unconfigured direct transport.
    pub async fn probe(&self, transport: TransportKind) -> Result<ProbeReport> {
        self.client.probe(transport).await
    }

    /// Cancel everything; later intents fail as cancelled.
    pub fn shutdown(&self) {
        self.listing.lock().cancel();
        self.coordinator.shutdown();
        info!("application context shut down");
    }

    fn cancel_running(&self, reason: &str) {
        let previous = std::mem::replace(&mut *self.listing.lock(), CancellationToken::new());
        previous.cancel();
        if self.coordinator.cancel() {
            info!(reason, "cancelled running sync");
        }
    }
}
