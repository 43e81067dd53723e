//! Error types used throughout the bridge

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_wire_name;

/// Main error type for Stockbridge
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BridgeError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded after {0} ms")]
    Timeout(u64),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("No catalog source mapped for source code {0}")]
    MappingMissing(String),

    #[error("{failed} of {submitted} items failed")]
    PartialBatchFailure { submitted: usize, failed: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`BridgeError`], used in logs, notifications
/// and job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    NotFound,
    Validation,
    RateLimited,
    ServerError,
    Network,
    Cancelled,
    Timeout,
    UnknownSource,
    MappingMissing,
    PartialBatchFailure,
    Config,
    Internal,
}

impl_wire_name!(ErrorKind {
    Auth => "auth",
    NotFound => "not_found",
    Validation => "validation",
    RateLimited => "rate_limited",
    ServerError => "server_error",
    Network => "network",
    Cancelled => "cancelled",
    Timeout => "timeout",
    UnknownSource => "unknown_source",
    MappingMissing => "mapping_missing",
    PartialBatchFailure => "partial_batch_failure",
    Config => "config",
    Internal => "internal",
});

impl BridgeError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ServerError(_) => ErrorKind::ServerError,
            Self::Network(_) => ErrorKind::Network,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::UnknownSource(_) => ErrorKind::UnknownSource,
            Self::MappingMissing(_) => ErrorKind::MappingMissing,
            Self::PartialBatchFailure { .. } => ErrorKind::PartialBatchFailure,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures worth another attempt of an idempotent request.
    ///
    /// `Timeout` is excluded: it marks the overall request deadline, after
    /// which no further attempts are made.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ServerError(_) | Self::Network(_))
    }

    /// Whether this error came from a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short human-readable message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Auth(m)
            | Self::NotFound(m)
            | Self::Validation(m)
            | Self::RateLimited(m)
            | Self::ServerError(m)
            | Self::Network(m)
            | Self::UnknownSource(m)
            | Self::MappingMissing(m)
            | Self::Config(m)
            | Self::Internal(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Stockbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
