//! # Streambot Shared
//!
//! This crate defines the domain types shared across the streambot crates:
//! channels, the client-facing identifiers they are addressed by, and the
//! subscriptions between them.

pub mod types;

pub use types::channel::{Channel, ExternalId};
pub use types::subscription::Subscription;
