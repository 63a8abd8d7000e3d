//! # Streambot Repository
//!
//! This crate maps channels and subscriptions onto a remote property graph.
//! It includes the error taxonomy, the backend interface, a Rexster
//! implementation speaking Gremlin over HTTP, an in-memory implementation,
//! the `GraphStore` that owns the entity-to-graph mapping, and the
//! `SubscriptionService` that validates input in front of it.
//!
//! The backend assigns its own vertex ids and ignores client-supplied ones, so
//! every channel carries a service-generated external id as an indexed vertex
//! property. Operations that touch edges first resolve external ids to backend
//! handles.

pub mod config;
pub mod errors;
pub mod identity;
pub mod interfaces;
pub mod memory;
pub mod rexster;
pub mod script;
pub mod service;
pub mod store;
pub mod types;

pub use config::GraphStoreConfig;
pub use errors::StoreError;
pub use identity::{new_external_id, IdGenerator, UuidGenerator};
pub use interfaces::GraphBackend;
pub use memory::MemoryGraph;
pub use rexster::{RexsterBackend, RexsterConfig};
pub use script::TraversalScript;
pub use service::SubscriptionService;
pub use store::GraphStore;
pub use types::{Edge, Element, PropertyMap, Vertex, VertexHandle};
