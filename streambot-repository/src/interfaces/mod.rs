//! This module defines and re-exports the interfaces of the repository.
mod graph_backend;

pub use graph_backend::GraphBackend;
