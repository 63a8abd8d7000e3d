//! Graph schema constants and configuration for the `GraphStore`.

/// Vertex property holding the channel's external id. Indexed by the backend.
pub const EXTERNAL_ID_KEY: &str = "uid";

/// Vertex property holding the channel's name.
pub const NAME_KEY: &str = "name";

/// Label of the edge pointing from a subscriber to the channel it subscribes to.
pub const SUBSCRIBE_LABEL: &str = "subscribe";

/// Edge property holding the subscription creation time.
pub const CREATED_AT_KEY: &str = "created_at";

/// Default number of hops followed by a transitive subscription traversal.
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: u32 = 5;

/// Configuration for the `GraphStore`.
#[derive(Debug, Clone)]
pub struct GraphStoreConfig {
    /// Maximum number of `subscribe` hops followed when collecting transitive
    /// subscriptions. Subscriptions may form cycles, so the bound is always
    /// enforced. Values below 1 are raised to 1.
    pub max_traversal_depth: u32,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
        }
    }
}

impl GraphStoreConfig {
    /// Create a config with a custom traversal depth bound.
    pub fn with_max_traversal_depth(max_traversal_depth: u32) -> Self {
        Self {
            max_traversal_depth: max_traversal_depth.max(1),
        }
    }
}
