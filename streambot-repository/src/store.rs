//! Graph-backed entity store.
//!
//! Maps channels onto vertices and subscriptions onto `subscribe` edges. The
//! backend never honours client-chosen vertex ids, so each channel is stored
//! with a generated external id in the indexed `uid` property, and every
//! operation that needs a vertex resolves that property first.

use std::collections::HashSet;
use std::sync::Arc;
use streambot_shared::{Channel, ExternalId, Subscription};
use tracing::{debug, error, info, warn};

use crate::config::{GraphStoreConfig, EXTERNAL_ID_KEY};
use crate::errors::StoreError;
use crate::identity::{IdGenerator, UuidGenerator};
use crate::interfaces::GraphBackend;
use crate::script::TraversalScript;
use crate::types::{channel_properties, Element, Vertex, VertexHandle};

/// Owns the mapping between domain entities and graph primitives.
///
/// Every method is one or more independent round trips to the backend and is
/// safe to call concurrently. Nothing is cached; each read is a live query.
/// Backend failures are returned, never retried.
pub struct GraphStore {
    backend: Arc<dyn GraphBackend>,
    ids: Arc<dyn IdGenerator>,
    config: GraphStoreConfig,
}

impl GraphStore {
    /// Create a store with random UUID external ids and the default config.
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self::with_config(backend, GraphStoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn GraphBackend>, config: GraphStoreConfig) -> Self {
        Self {
            backend,
            ids: Arc::new(UuidGenerator),
            config,
        }
    }

    /// Replace the external id generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &GraphStoreConfig {
        &self.config
    }

    /// Check that the backend is reachable and ready for requests.
    pub async fn check_ready(&self) -> Result<(), StoreError> {
        self.backend.check_ready().await
    }

    /// Persist a new channel and return its freshly generated external id.
    ///
    /// One backend write. The vertex carries both the external id and the
    /// name; the backend-assigned handle is not returned to the caller.
    pub async fn save_channel(&self, name: &str) -> Result<ExternalId, StoreError> {
        let id = self.ids.next_id();
        let properties = channel_properties(&id, name);

        let vertex = self.backend.create_vertex(&properties).await.map_err(|e| {
            error!(external_id = %id, error = %e, "Failed to save channel vertex");
            e
        })?;

        info!(external_id = %id, handle = %vertex.handle, "Saved channel");
        Ok(id)
    }

    /// Fetch a channel by external id.
    ///
    /// # Returns
    ///
    /// * `Ok(Channel)` - Exactly one vertex matched
    /// * `Err(StoreError::NotFound)` - No vertex matched
    /// * `Err(StoreError::Inconsistent)` - More than one vertex matched
    pub async fn get_channel(&self, id: &ExternalId) -> Result<Channel, StoreError> {
        self.resolve(id).await?.to_channel()
    }

    /// Persist the subscription `from -> to`.
    ///
    /// Both ends are resolved first; a missing end fails with
    /// `DanglingReference` and no edge write is attempted. The existence check
    /// and the edge creation are then sent as one script, so a repeated call
    /// leaves a single edge. Whether two concurrent first calls for the same
    /// pair can both create an edge depends on the backend evaluating the
    /// script atomically; Rexster on Titan does not lock across it.
    pub async fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let from = self.resolve_reference(&subscription.from).await?;
        let to = self.resolve_reference(&subscription.to).await?;

        let script = TraversalScript::SubscribeIfAbsent {
            from: from.handle,
            to: to.handle,
            created_at: subscription.created_at,
        };
        let result = self.backend.eval(&script).await.map_err(|e| {
            error!(
                from = %subscription.from,
                to = %subscription.to,
                error = %e,
                "Failed to save subscription"
            );
            e
        })?;

        match result.iter().filter_map(Element::as_edge).count() {
            0 => Err(StoreError::rejected(
                "subscription script returned no edge",
            )),
            1 => {
                debug!(from = %subscription.from, to = %subscription.to, "Saved subscription");
                Ok(())
            }
            n => {
                warn!(
                    from = %subscription.from,
                    to = %subscription.to,
                    edges = n,
                    "Duplicate subscribe edges found between channels"
                );
                Ok(())
            }
        }
    }

    /// Collect every channel reachable from `id` over `subscribe` edges,
    /// within the configured depth bound.
    ///
    /// The start channel is resolved first, so a missing channel is
    /// `NotFound` while an existing channel without subscriptions yields an
    /// empty list. Each reachable channel appears once; the start channel is
    /// never part of the result, even on cycles.
    pub async fn get_transitive_subscriptions(
        &self,
        id: &ExternalId,
    ) -> Result<Vec<Channel>, StoreError> {
        let start = self.resolve(id).await?;

        let script = TraversalScript::FanOut {
            start: start.handle.clone(),
            max_depth: self.config.max_traversal_depth,
        };
        let result = self.backend.eval(&script).await.map_err(|e| {
            error!(external_id = %id, error = %e, "Failed to traverse subscriptions");
            e
        })?;

        let mut channels: Vec<Channel> = Vec::with_capacity(result.len());
        let mut seen: HashSet<ExternalId> = HashSet::with_capacity(result.len());
        for element in result {
            let vertex = element
                .into_vertex()
                .ok_or_else(|| StoreError::rejected("subscription traversal returned an edge"))?;
            if vertex.handle == start.handle {
                continue;
            }
            let channel = vertex.to_channel()?;
            if seen.insert(channel.id.clone()) {
                channels.push(channel);
            }
        }

        debug!(external_id = %id, count = channels.len(), "Fetched transitive subscriptions");
        Ok(channels)
    }

    /// Resolve an external id to its single vertex.
    ///
    /// This is the only place that turns an external id into a backend
    /// handle.
    async fn resolve(&self, id: &ExternalId) -> Result<Vertex, StoreError> {
        let mut vertices = self
            .backend
            .query_vertices(EXTERNAL_ID_KEY, id.as_str())
            .await?;

        match vertices.len() {
            0 => Err(StoreError::NotFound(id.clone())),
            1 => Ok(vertices.remove(0)),
            matches => {
                let handles: Vec<&VertexHandle> = vertices.iter().map(|v| &v.handle).collect();
                error!(
                    external_id = %id,
                    matches,
                    handles = ?handles,
                    "External id index returned more than one vertex"
                );
                Err(StoreError::Inconsistent {
                    id: id.clone(),
                    matches,
                })
            }
        }
    }

    /// Like `resolve`, but a missing vertex is a dangling reference.
    async fn resolve_reference(&self, id: &ExternalId) -> Result<Vertex, StoreError> {
        self.resolve(id).await.map_err(|e| match e {
            StoreError::NotFound(id) => StoreError::DanglingReference(id),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::types::PropertyMap;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Always hands out the same id, to provoke duplicate external ids.
    struct FixedIds(&'static str);

    impl IdGenerator for FixedIds {
        fn next_id(&self) -> ExternalId {
            ExternalId::new(self.0)
        }
    }

    /// Backend that records calls and answers scripts with a canned result.
    struct ScriptedBackend {
        vertices: Vec<Vertex>,
        script_result: Vec<Element>,
        scripts: Mutex<Vec<TraversalScript>>,
    }

    #[async_trait]
    impl GraphBackend for ScriptedBackend {
        async fn check_ready(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create_vertex(&self, _properties: &PropertyMap) -> Result<Vertex, StoreError> {
            Err(StoreError::rejected("backend reported no created vertex"))
        }

        async fn query_vertices(&self, _key: &str, value: &str) -> Result<Vec<Vertex>, StoreError> {
            Ok(self
                .vertices
                .iter()
                .filter(|v| v.string_property(EXTERNAL_ID_KEY) == Some(value))
                .cloned()
                .collect())
        }

        async fn eval(&self, script: &TraversalScript) -> Result<Vec<Element>, StoreError> {
            self.scripts.lock().unwrap().push(script.clone());
            Ok(self.script_result.clone())
        }
    }

    fn vertex(handle: i64, id: &str, name: &str) -> Vertex {
        Vertex::new(
            VertexHandle::Numeric(handle),
            channel_properties(&ExternalId::new(id), name),
        )
    }

    #[tokio::test]
    async fn test_duplicate_external_ids_are_inconsistent() {
        let graph = Arc::new(MemoryGraph::new());
        let store = GraphStore::new(graph.clone()).with_id_generator(Arc::new(FixedIds("dup")));

        store.save_channel("first").await.unwrap();
        store.save_channel("second").await.unwrap();

        let result = store.get_channel(&ExternalId::new("dup")).await;
        match result {
            Err(StoreError::Inconsistent { id, matches }) => {
                assert_eq!(id.as_str(), "dup");
                assert_eq!(matches, 2);
            }
            other => panic!("expected Inconsistent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_channel_propagates_missing_result() {
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![],
            script_result: vec![],
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::new(backend);

        assert!(matches!(
            store.save_channel("alpha").await,
            Err(StoreError::BackendRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_subscription_script_uses_resolved_handles() {
        let edge = Element::Edge(crate::types::Edge {
            label: "subscribe".to_string(),
            out_vertex: VertexHandle::Numeric(4),
            in_vertex: VertexHandle::Numeric(8),
            properties: PropertyMap::new(),
        });
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![vertex(4, "a", "alpha"), vertex(8, "b", "beta")],
            script_result: vec![edge],
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::new(backend.clone());

        store
            .save_subscription(&Subscription::new("a", "b", 1000))
            .await
            .unwrap();

        let scripts = backend.scripts.lock().unwrap();
        assert_eq!(
            *scripts,
            vec![TraversalScript::SubscribeIfAbsent {
                from: VertexHandle::Numeric(4),
                to: VertexHandle::Numeric(8),
                created_at: 1000,
            }]
        );
    }

    #[tokio::test]
    async fn test_subscription_script_without_edge_is_rejected() {
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![vertex(4, "a", "alpha"), vertex(8, "b", "beta")],
            script_result: vec![],
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::new(backend);

        assert!(matches!(
            store.save_subscription(&Subscription::new("a", "b", 1)).await,
            Err(StoreError::BackendRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_drops_start_and_duplicates() {
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![vertex(4, "a", "alpha")],
            script_result: vec![
                Element::Vertex(vertex(8, "b", "beta")),
                Element::Vertex(vertex(4, "a", "alpha")),
                Element::Vertex(vertex(8, "b", "beta")),
            ],
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::with_config(
            backend.clone(),
            GraphStoreConfig::with_max_traversal_depth(3),
        );

        let channels = store
            .get_transitive_subscriptions(&ExternalId::new("a"))
            .await
            .unwrap();

        assert_eq!(channels, vec![Channel::new("b", "beta")]);
        assert_eq!(
            backend.scripts.lock().unwrap()[0],
            TraversalScript::FanOut {
                start: VertexHandle::Numeric(4),
                max_depth: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_traversal_keeps_first_seen_order_over_large_results() {
        let uids: Vec<String> = (0..2000).map(|i| format!("c{}", i)).collect();
        let mut script_result = Vec::new();
        for round in 0..3 {
            for (i, uid) in uids.iter().enumerate().skip(round * 500) {
                script_result.push(Element::Vertex(vertex(100 + i as i64, uid, uid)));
            }
        }
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![vertex(4, "a", "alpha")],
            script_result,
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::new(backend);

        let channels = store
            .get_transitive_subscriptions(&ExternalId::new("a"))
            .await
            .unwrap();

        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        let expected: Vec<&str> = uids.iter().map(String::as_str).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_traversal_with_malformed_vertex_is_rejected() {
        let mut malformed = PropertyMap::new();
        malformed.insert("name".to_string(), json!("no uid"));
        let backend = Arc::new(ScriptedBackend {
            vertices: vec![vertex(4, "a", "alpha")],
            script_result: vec![Element::Vertex(Vertex::new(
                VertexHandle::Numeric(9),
                malformed,
            ))],
            scripts: Mutex::new(vec![]),
        });
        let store = GraphStore::new(backend);

        assert!(matches!(
            store
                .get_transitive_subscriptions(&ExternalId::new("a"))
                .await,
            Err(StoreError::BackendRejected(_))
        ));
    }
}
