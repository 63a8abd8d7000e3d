//! Store error types.
//!
//! Covers client input errors, point-query outcomes other than a single match,
//! and failures talking to the graph backend.

use streambot_shared::ExternalId;
use thiserror::Error;

/// Unified errors from graph store and subscription service operations.
///
/// Backend failures are never retried by the store; they are returned as-is so
/// the caller can decide on a retry policy.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Malformed client input. Never reaches the backend.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A point query by external id matched no vertex.
    #[error("Channel not found: {0}")]
    NotFound(ExternalId),

    /// A point query by external id matched more than one vertex, which means
    /// the external id index is broken.
    #[error("Inconsistent graph: {matches} vertices share external id {id}")]
    Inconsistent { id: ExternalId, matches: usize },

    /// An edge operation referenced a channel that does not exist.
    #[error("Dangling reference to channel {0}")]
    DanglingReference(ExternalId),

    /// The backend could not be reached (connect, timeout, transport failures).
    #[error("Graph backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The backend answered a well-formed request with an error, an
    /// unexpected payload, or no result at all.
    #[error("Graph backend rejected request: {0}")]
    BackendRejected(String),
}

impl StoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a backend unreachable error.
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::BackendUnreachable(msg.into())
    }

    /// Create a backend rejected error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::BackendRejected(msg.into())
    }

    /// True for failures caused by the backend rather than by the request.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendUnreachable(_) | Self::BackendRejected(_) | Self::Inconsistent { .. }
        )
    }
}
