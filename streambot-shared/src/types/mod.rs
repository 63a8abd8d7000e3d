//! This module defines the core domain types of the subscription service.
//! It re-exports `Channel`, `ExternalId` and `Subscription`.

pub mod channel;
pub mod subscription;

pub use channel::{Channel, ExternalId};
pub use subscription::Subscription;
