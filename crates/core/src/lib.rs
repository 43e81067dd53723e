//! # Stockbridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The static source-code map between MDM sources and catalog sources
//! - The catalog search parameter builder
//! - The direct/proxy routing policy
//! - Batch preparation, partitioning and the sub-batch pipeline
//! - The sync coordinator and its progress events
//! - Port interfaces (traits) implemented by `stockbridge-infra`
//!
//! ## Architecture Principles
//! - Only depends on `stockbridge-domain`
//! - No HTTP or file system code
//! - All external dependencies via traits

pub mod inventory;
pub mod params;
pub mod routing;
pub mod source_map;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use inventory::batching::{partition, prepare_items, PreparedItems};
pub use inventory::pipeline::{run_sub_batches, PipelineOptions};
pub use inventory::ports::{BatchObserver, BatchTick, InventoryPort, PushContext};
pub use params::{build_search_params, ParamValue, Params};
pub use routing::{route, RouteDecision};
pub use source_map::SourceMap;
pub use sync::coordinator::{SyncCoordinator, SyncEvent, SyncJob};
pub use sync::selection::{select_rows, Selection};
