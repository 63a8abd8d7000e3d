//! Parsing of Rexster JSON responses into graph elements.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::StoreError;
use crate::types::{Edge, Element, PropertyMap, Vertex, VertexHandle};

/// Envelope Rexster wraps every answer in.
#[derive(Debug, Deserialize)]
pub(crate) struct RexsterResponse {
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RexsterResponse {
    /// The most specific error text the backend supplied, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }

    /// Convert the `results` field into elements.
    ///
    /// `results` is an array for queries and scripts and a bare object for
    /// single-vertex creation. A missing `results` or an explicit
    /// `"success": false` is a rejection.
    pub fn into_elements(self) -> Result<Vec<Element>, StoreError> {
        if self.success == Some(false) {
            return Err(StoreError::rejected(
                self.error_message()
                    .unwrap_or_else(|| "script evaluation failed".to_string()),
            ));
        }

        match self.results {
            Some(Value::Array(items)) => items.iter().map(parse_element).collect(),
            Some(item @ Value::Object(_)) => Ok(vec![parse_element(&item)?]),
            Some(Value::Null) | None => Err(StoreError::rejected("backend returned no result")),
            Some(other) => Err(StoreError::rejected(format!(
                "unexpected result `{}`",
                other
            ))),
        }
    }
}

fn parse_element(value: &Value) -> Result<Element, StoreError> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::rejected(format!("expected a graph element, got `{}`", value)))?;

    let handle_of = |key: &str| {
        object
            .get(key)
            .and_then(VertexHandle::from_json)
            .ok_or_else(|| StoreError::rejected(format!("element without `{}`: {}", key, value)))
    };

    // Reserved keys start with an underscore; everything else is a property.
    let properties: PropertyMap = object
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    match object.get("_type").and_then(Value::as_str) {
        Some("vertex") => Ok(Element::Vertex(Vertex::new(handle_of("_id")?, properties))),
        Some("edge") => {
            let label = object
                .get("_label")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::rejected(format!("edge without `_label`: {}", value)))?;
            Ok(Element::Edge(Edge {
                label: label.to_string(),
                out_vertex: handle_of("_outV")?,
                in_vertex: handle_of("_inV")?,
                properties,
            }))
        }
        _ => Err(StoreError::rejected(format!(
            "element with unknown `_type`: {}",
            value
        ))),
    }
}
