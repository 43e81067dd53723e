//! Runtime settings shared by the client, repository and coordinator

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_SIZE, DEFAULT_BRANCH, DEFAULT_CACHE_DURATION_MS,
    DEFAULT_GATEWAY_URL, DEFAULT_INTER_BATCH_DELAY_MS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_CACHE_SIZE,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_SOURCE_FILTER, DEFAULT_TIMEOUT_MS,
};
use crate::errors::{BridgeError, Result};

/// Bridge settings.
///
/// Field names follow the camelCase option names used in configuration
/// files; millisecond options keep their short names (`timeout`,
/// `retryDelay`, ...) and are exposed as [`Duration`] through accessors.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub direct_enabled: bool,
    pub catalog_root: Option<String>,
    pub access_token: Option<String>,
    pub gateway_url: String,
    pub cache_enabled: bool,
    #[serde(rename = "cacheDuration")]
    pub cache_duration_ms: u64,
    pub max_cache_size: usize,
    pub retry_attempts: u32,
    #[serde(rename = "retryDelay")]
    pub retry_delay_ms: u64,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    pub batch_size: usize,
    pub batch_concurrency: usize,
    #[serde(rename = "interBatchDelay")]
    pub inter_batch_delay_ms: u64,
    pub default_branch: String,
    pub default_source_filter: String,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            direct_enabled: false,
            catalog_root: None,
            access_token: None,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            cache_enabled: true,
            cache_duration_ms: DEFAULT_CACHE_DURATION_MS,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            inter_batch_delay_ms: DEFAULT_INTER_BATCH_DELAY_MS,
            default_branch: DEFAULT_BRANCH.to_string(),
            default_source_filter: DEFAULT_SOURCE_FILTER.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("direct_enabled", &self.direct_enabled)
            .field("catalog_root", &self.catalog_root)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("gateway_url", &self.gateway_url)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_duration_ms", &self.cache_duration_ms)
            .field("max_cache_size", &self.max_cache_size)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("batch_size", &self.batch_size)
            .field("batch_concurrency", &self.batch_concurrency)
            .field("inter_batch_delay_ms", &self.inter_batch_delay_ms)
            .field("default_branch", &self.default_branch)
            .field("default_source_filter", &self.default_source_filter)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Settings {
    #[must_use]
    pub const fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Overall deadline of a single request, retries included.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Whether the direct transport has what it needs to be built.
    #[must_use]
    pub fn direct_configured(&self) -> bool {
        self.catalog_root.as_deref().is_some_and(|root| !root.trim().is_empty())
    }

    /// Checks option combinations that cannot work at runtime.
    ///
    /// URL syntax is checked by the infra loader, which owns the URL parser.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(BridgeError::Config("batchSize must be greater than 0".into()));
        }
        if self.batch_concurrency == 0 {
            return Err(BridgeError::Config("batchConcurrency must be greater than 0".into()));
        }
        if self.cache_enabled && self.max_cache_size == 0 {
            return Err(BridgeError::Config(
                "maxCacheSize must be greater than 0 when caching is enabled".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(BridgeError::Config("timeout must be greater than 0".into()));
        }
        if self.direct_enabled && !self.direct_configured() {
            return Err(BridgeError::Config("directEnabled requires catalogRoot".into()));
        }
        if self.gateway_url.trim().is_empty() {
            return Err(BridgeError::Config("gatewayUrl must not be empty".into()));
        }
        Ok(())
    }
}
