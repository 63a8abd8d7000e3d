use serde::{Deserialize, Serialize};

use super::channel::ExternalId;

/// Directed subscription of one channel to another.
///
/// `created_at` is the client-supplied creation time in seconds since the
/// Unix epoch. At most one subscription exists per ordered `(from, to)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub from: ExternalId,
    pub to: ExternalId,
    pub created_at: i64,
}

impl Subscription {
    pub fn new(from: impl Into<ExternalId>, to: impl Into<ExternalId>, created_at: i64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            created_at,
        }
    }
}
