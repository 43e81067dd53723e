//! Catalog and MDM HTTP access

pub mod cache;
pub mod client;
pub mod global;
pub mod metrics;
pub mod request;
pub mod transport;

pub use cache::{cache_key, ResponseCache};
pub use client::{CatalogClient, CatalogClientBuilder, ProbeReport};
pub use metrics::ClientMetrics;
pub use request::{HttpRequest, HttpResponse, Target};
pub use transport::{HttpTransport, RawResponse, Transport};
