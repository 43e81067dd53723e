//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! bridge.

// Catalog client defaults
pub const DEFAULT_CACHE_DURATION_MS: u64 = 300_000;
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

// Batching defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 1;
pub const DEFAULT_INTER_BATCH_DELAY_MS: u64 = 2_000;

// Grid defaults
pub const DEFAULT_BRANCH: &str = "16";
pub const DEFAULT_SOURCE_FILTER: &str = "all";
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_SORT_FIELD: &str = "lastUpdatedAt";

/// Filter value meaning "no restriction" for branch and source selectors.
pub const ALL_FILTER: &str = "all";

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Parameter builder
pub const DEFAULT_FIELD_NAME: &str = "name";
pub const DEFAULT_CONDITION_TYPE: &str = "eq";

/// Substrings that betray an unrendered template placeholder in a search field.
pub const TEMPLATE_SENTINELS: [&str; 3] = ["%fieldName", "${", "%{"];

// Metrics
pub const RESPONSE_TIME_WINDOW: usize = 100;
