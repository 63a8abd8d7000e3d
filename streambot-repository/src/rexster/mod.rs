//! Rexster graph backend.
//!
//! Talks to a Rexster server (typically fronting Titan on Cassandra) through
//! its REST API and Gremlin script extension.

mod config;
mod provider;
mod response;

pub use config::RexsterConfig;
pub use provider::RexsterBackend;
