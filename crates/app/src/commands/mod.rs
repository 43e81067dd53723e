//! Commands exposed to the grid and the CLI
//!
//! Each command wraps one [`crate::AppContext`] operation and logs its
//! outcome and duration.

pub mod diagnostics;
pub mod inventory;

pub use diagnostics::{get_metrics, probe_transport, reset_metrics, StatusReport};
pub use inventory::{
    cancel_sync, catalog_stock, list_inventory, mark_stocks_changed, sync_all_for_source,
    sync_selected,
};
