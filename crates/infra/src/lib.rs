//! # Stockbridge Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The resilient catalog client (direct/proxy transports, retry, cache,
//!   metrics, cancellation)
//! - The HTTP inventory repository over the MDM gateway and the catalog
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `stockbridge-core`
//! - Contains all "impure" code (network, files, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod inventory;
pub mod mdm;
pub mod observability;
pub mod time;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{global, CatalogClient, HttpRequest, HttpResponse, ProbeReport};
pub use inventory::HttpInventoryRepository;
pub use observability::init_tracing;
pub use time::{Clock, ManualClock, SharedClock, SystemClock};
