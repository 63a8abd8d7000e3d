//! In-memory graph backend.
//!
//! Keeps vertices and edges in process behind a single mutex, which makes
//! every script evaluation atomic. Used by the test suites and for running the
//! API locally without a graph database (`GRAPH_BACKEND=memory`).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use streambot_shared::ExternalId;
use tracing::debug;

use crate::config::{CREATED_AT_KEY, EXTERNAL_ID_KEY, SUBSCRIBE_LABEL};
use crate::errors::StoreError;
use crate::interfaces::GraphBackend;
use crate::script::TraversalScript;
use crate::types::{Edge, Element, PropertyMap, Vertex, VertexHandle};

#[derive(Debug, Default)]
struct GraphData {
    next_handle: i64,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl GraphData {
    fn contains(&self, handle: &VertexHandle) -> bool {
        self.vertices.iter().any(|v| &v.handle == handle)
    }

    fn vertex(&self, handle: &VertexHandle) -> Option<&Vertex> {
        self.vertices.iter().find(|v| &v.handle == handle)
    }

    fn insert(&mut self, properties: PropertyMap) -> Vertex {
        self.next_handle += 1;
        let vertex = Vertex::new(VertexHandle::Numeric(self.next_handle), properties);
        self.vertices.push(vertex.clone());
        vertex
    }

    fn subscribes_to<'a>(&'a self, from: &'a VertexHandle) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.label == SUBSCRIBE_LABEL && &e.out_vertex == from)
    }

    fn handles_for(&self, id: &ExternalId) -> Vec<VertexHandle> {
        self.vertices
            .iter()
            .filter(|v| v.string_property(EXTERNAL_ID_KEY) == Some(id.as_str()))
            .map(|v| v.handle.clone())
            .collect()
    }
}

/// Property graph held in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    data: Mutex<GraphData>,
    script_evaluations: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unreachable("in-memory graph marked unavailable"));
        }
        Ok(())
    }

    /// Simulate an outage: while set, every call fails with
    /// `StoreError::BackendUnreachable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a vertex directly, bypassing the store.
    pub fn insert_vertex(&self, properties: PropertyMap) -> VertexHandle {
        self.lock().insert(properties).handle
    }

    pub fn vertex_count(&self) -> usize {
        self.lock().vertices.len()
    }

    /// Number of `subscribe` edges between the channels with the given
    /// external ids.
    pub fn subscription_count(&self, from: &ExternalId, to: &ExternalId) -> usize {
        let data = self.lock();
        let from_handles = data.handles_for(from);
        let to_handles = data.handles_for(to);
        data.edges
            .iter()
            .filter(|e| {
                e.label == SUBSCRIBE_LABEL
                    && from_handles.contains(&e.out_vertex)
                    && to_handles.contains(&e.in_vertex)
            })
            .count()
    }

    pub fn total_edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    /// Number of scripts evaluated so far.
    pub fn script_evaluations(&self) -> usize {
        self.script_evaluations.load(Ordering::SeqCst)
    }

    fn subscribe_if_absent(
        data: &mut GraphData,
        from: &VertexHandle,
        to: &VertexHandle,
        created_at: i64,
    ) -> Result<Vec<Element>, StoreError> {
        for handle in [from, to] {
            if !data.contains(handle) {
                return Err(StoreError::rejected(format!("no vertex with id {}", handle)));
            }
        }

        let existing: Vec<Element> = data
            .subscribes_to(from)
            .filter(|e| &e.in_vertex == to)
            .cloned()
            .map(Element::Edge)
            .collect();
        if !existing.is_empty() {
            return Ok(existing);
        }

        let mut properties = PropertyMap::new();
        properties.insert(CREATED_AT_KEY.to_string(), Value::from(created_at));
        let edge = Edge {
            label: SUBSCRIBE_LABEL.to_string(),
            out_vertex: from.clone(),
            in_vertex: to.clone(),
            properties,
        };
        data.edges.push(edge.clone());
        Ok(vec![Element::Edge(edge)])
    }

    fn fan_out(
        data: &GraphData,
        start: &VertexHandle,
        max_depth: u32,
    ) -> Result<Vec<Element>, StoreError> {
        if !data.contains(start) {
            return Err(StoreError::rejected(format!("no vertex with id {}", start)));
        }

        let mut seen: HashSet<VertexHandle> = HashSet::from([start.clone()]);
        let mut frontier: VecDeque<VertexHandle> = VecDeque::from([start.clone()]);
        let mut reached = Vec::new();

        for _ in 0..max_depth.max(1) {
            let mut next = VecDeque::new();
            while let Some(handle) = frontier.pop_front() {
                for edge in data.subscribes_to(&handle) {
                    if seen.insert(edge.in_vertex.clone()) {
                        next.push_back(edge.in_vertex.clone());
                        if let Some(vertex) = data.vertex(&edge.in_vertex) {
                            reached.push(Element::Vertex(vertex.clone()));
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(reached)
    }
}

#[async_trait]
impl GraphBackend for MemoryGraph {
    async fn check_ready(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }

    async fn create_vertex(&self, properties: &PropertyMap) -> Result<Vertex, StoreError> {
        self.ensure_available()?;
        let vertex = self.lock().insert(properties.clone());
        debug!(handle = %vertex.handle, "Created vertex in memory graph");
        Ok(vertex)
    }

    async fn query_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .lock()
            .vertices
            .iter()
            .filter(|v| v.string_property(key) == Some(value))
            .cloned()
            .collect())
    }

    async fn eval(&self, script: &TraversalScript) -> Result<Vec<Element>, StoreError> {
        self.ensure_available()?;
        self.script_evaluations.fetch_add(1, Ordering::SeqCst);

        let mut data = self.lock();
        match script {
            TraversalScript::SubscribeIfAbsent {
                from,
                to,
                created_at,
            } => Self::subscribe_if_absent(&mut data, from, to, *created_at),
            TraversalScript::FanOut { start, max_depth } => {
                Self::fan_out(&data, start, *max_depth)
            }
        }
    }
}
