//! Graph backend trait definition.
//!
//! This module defines the abstract interface to the property graph database,
//! allowing the store to run against Rexster or against the in-memory graph.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::script::TraversalScript;
use crate::types::{Element, PropertyMap, Vertex};

/// Abstracts the remote property graph.
///
/// Implementations are injected into `GraphStore`. Each method is one round
/// trip to the backend and is safe to call concurrently; writes are
/// serialized by the backend, not by the caller.
///
/// Errors are restricted to `StoreError::BackendUnreachable` (transport
/// failures) and `StoreError::BackendRejected` (error answers, malformed or
/// missing results). Implementations must not retry.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Check that the backend answers and the configured graph exists.
    ///
    /// Called during application startup before serving requests.
    async fn check_ready(&self) -> Result<(), StoreError>;

    /// Create a vertex carrying `properties` and return it with the handle
    /// the backend assigned. The backend chooses the handle.
    async fn create_vertex(&self, properties: &PropertyMap) -> Result<Vertex, StoreError>;

    /// Return every vertex whose indexed property `key` equals `value`.
    async fn query_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError>;

    /// Evaluate a traversal script and return its result elements.
    async fn eval(&self, script: &TraversalScript) -> Result<Vec<Element>, StoreError>;
}
