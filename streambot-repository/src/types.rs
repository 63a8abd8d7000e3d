//! Graph primitives exchanged with a `GraphBackend`.
//!
//! These types never leave the repository crate's API surface toward HTTP
//! clients; handlers only ever see `Channel`.

use serde_json::{Map, Value};
use std::fmt;
use streambot_shared::{Channel, ExternalId};

use crate::config::{EXTERNAL_ID_KEY, NAME_KEY};
use crate::errors::StoreError;

/// Property map of a vertex or edge.
pub type PropertyMap = Map<String, Value>;

/// Opaque, backend-assigned vertex id.
///
/// Rexster on Titan reports numeric ids; other deployments report strings.
/// Handles are only ever used to address vertices in follow-up scripts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VertexHandle {
    Numeric(i64),
    Text(String),
}

impl VertexHandle {
    /// Read a handle from the JSON representation the backend uses for `_id`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Numeric),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A stored vertex: backend handle plus its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub handle: VertexHandle,
    pub properties: PropertyMap,
}

impl Vertex {
    pub fn new(handle: VertexHandle, properties: PropertyMap) -> Self {
        Self { handle, properties }
    }

    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// The external id stored on the vertex, if any.
    pub fn external_id(&self) -> Option<ExternalId> {
        self.string_property(EXTERNAL_ID_KEY).map(ExternalId::from)
    }

    /// Map a channel vertex back to the domain type.
    ///
    /// A vertex missing either property cannot be a channel written by this
    /// service; it is reported as a rejected backend result.
    pub fn to_channel(&self) -> Result<Channel, StoreError> {
        let id = self.external_id().ok_or_else(|| {
            StoreError::rejected(format!(
                "vertex {} has no `{}` property",
                self.handle, EXTERNAL_ID_KEY
            ))
        })?;
        let name = self.string_property(NAME_KEY).ok_or_else(|| {
            StoreError::rejected(format!(
                "vertex {} has no `{}` property",
                self.handle, NAME_KEY
            ))
        })?;
        Ok(Channel::new(id, name))
    }
}

/// A stored, directed, labelled edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub label: String,
    pub out_vertex: VertexHandle,
    pub in_vertex: VertexHandle,
    pub properties: PropertyMap,
}

/// A single element of a script result.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Element {
    pub fn into_vertex(self) -> Option<Vertex> {
        match self {
            Self::Vertex(vertex) => Some(vertex),
            Self::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(edge) => Some(edge),
            Self::Vertex(_) => None,
        }
    }
}

/// Build the property map stored on a channel vertex.
pub fn channel_properties(id: &ExternalId, name: &str) -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert(EXTERNAL_ID_KEY.to_string(), Value::from(id.as_str()));
    properties.insert(NAME_KEY.to_string(), Value::from(name));
    properties
}
