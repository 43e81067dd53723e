//! HTTP-facing enums and the client metrics snapshot

use serde::{Deserialize, Serialize};

use crate::impl_wire_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl_wire_name!(HttpMethod {
    Get => "get",
    Head => "head",
    Post => "post",
    Put => "put",
    Delete => "delete",
});

impl HttpMethod {
    /// Verbs that may be replayed or sent through a second transport.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Post)
    }
}

/// Which backend served (or should serve) a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Straight to `<catalogRoot>/rest/V1` with a bearer token.
    Direct,
    /// Through the local gateway, which adds credentials server-side.
    Proxy,
    /// The MDM endpoints of the local gateway.
    Mdm,
}

impl_wire_name!(TransportKind {
    Direct => "direct",
    Proxy => "proxy",
    Mdm => "mdm",
});

/// Point-in-time view of the client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total: u64,
    pub cache_hits: u64,
    pub success: u64,
    pub errors: u64,
    pub direct_success: u64,
    pub direct_errors: u64,
    pub proxy_success: u64,
    pub proxy_errors: u64,
    pub cache_size: usize,
    pub cache_hit_rate: f64,
    pub avg_response_ms: f64,
}
