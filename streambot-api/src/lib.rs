//! # Streambot API
//!
//! HTTP surface for streambot: the axum router and handlers translating
//! requests into `SubscriptionService` calls, the `ServerLifecycle` that owns
//! the listener and drains in-flight requests on shutdown, settings and
//! dependency wiring for the binary, and the metric names emitted along the
//! way.

pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod server;

pub use config::{Dependencies, Settings};
pub use errors::{ApiError, AppError, LifecycleError};
pub use lifecycle::{InFlight, LifecycleConfig, LifecycleState, ServerLifecycle};
