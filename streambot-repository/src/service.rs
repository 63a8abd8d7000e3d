//! Subscription service.
//!
//! The domain-level API in front of `GraphStore`. It validates arguments and
//! delegates; it holds no state of its own.

use streambot_shared::{Channel, ExternalId, Subscription};

use crate::errors::StoreError;
use crate::store::GraphStore;

/// The main service for channels and subscriptions.
///
/// Calls map one-to-one onto `GraphStore`. Malformed input is rejected with
/// `StoreError::ValidationError` before the backend is touched.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use streambot_repository::{GraphStore, MemoryGraph, SubscriptionService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = GraphStore::new(Arc::new(MemoryGraph::new()));
/// let service = SubscriptionService::new(store);
///
/// let alpha = service.create_channel("alpha").await?;
/// let beta = service.create_channel("beta").await?;
/// service.subscribe(&alpha, &beta, 1000).await?;
///
/// let subscriptions = service.transitive_subscriptions(&alpha).await?;
/// assert_eq!(subscriptions[0].name, "beta");
/// # Ok(())
/// # }
/// ```
pub struct SubscriptionService {
    store: GraphStore,
}

impl SubscriptionService {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    fn validate_name(name: &str) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("name is required"));
        }
        Ok(())
    }

    fn validate_id(field_name: &str, id: &ExternalId) -> Result<(), StoreError> {
        if id.is_blank() {
            return Err(StoreError::validation(format!("{} is required", field_name)));
        }
        Ok(())
    }

    /// Create a channel named `name` and return its external id.
    pub async fn create_channel(&self, name: &str) -> Result<ExternalId, StoreError> {
        Self::validate_name(name)?;
        self.store.save_channel(name).await
    }

    /// Fetch the channel with external id `id`.
    pub async fn get_channel(&self, id: &ExternalId) -> Result<Channel, StoreError> {
        Self::validate_id("id", id)?;
        self.store.get_channel(id).await
    }

    /// Subscribe channel `from` to channel `to`. Idempotent.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The subscription exists (created now or earlier)
    /// * `Err(StoreError::ValidationError)` - An id is empty
    /// * `Err(StoreError::DanglingReference)` - Either channel does not exist
    /// * `Err(StoreError)` - Backend failure
    pub async fn subscribe(
        &self,
        from: &ExternalId,
        to: &ExternalId,
        created_at: i64,
    ) -> Result<(), StoreError> {
        Self::validate_id("id", from)?;
        Self::validate_id("channel_id", to)?;

        let subscription = Subscription::new(from.clone(), to.clone(), created_at);
        self.store.save_subscription(&subscription).await
    }

    /// Channels reachable from `id` through subscriptions.
    ///
    /// An empty list means the channel exists but subscribes to nothing; a
    /// missing channel is `StoreError::NotFound`.
    pub async fn transitive_subscriptions(
        &self,
        id: &ExternalId,
    ) -> Result<Vec<Channel>, StoreError> {
        Self::validate_id("id", id)?;
        self.store.get_transitive_subscriptions(id).await
    }
}
