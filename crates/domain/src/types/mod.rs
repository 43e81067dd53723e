//! Domain types and models

pub mod http;
pub mod inventory;
pub mod mapping;
pub mod query;
pub mod sync;

pub use http::{HttpMethod, MetricsSnapshot, TransportKind};
pub use inventory::{MdmRow, RowKey, SourceItem};
pub use mapping::SourceMapping;
pub use query::{
    FilterSpec, ListQuery, Page, Pagination, SearchQuery, SortDirection, SortSpec,
};
pub use sync::{
    Ack, AsyncReceipt, BatchResult, DropReason, DroppedRow, FailedItem, JobProgress,
    ProgressEvent, SyncKind, SyncNotification, SyncReport, SyncStage, SyncState,
};
