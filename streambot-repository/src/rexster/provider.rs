//! Rexster provider implementation.
//!
//! This module provides the concrete implementation of `GraphBackend` on top
//! of Rexster's REST API using `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, error, info};

use crate::errors::StoreError;
use crate::interfaces::GraphBackend;
use crate::rexster::config::RexsterConfig;
use crate::rexster::response::RexsterResponse;
use crate::script::TraversalScript;
use crate::types::{Element, PropertyMap, Vertex};

/// Rexster provider implementation.
///
/// Titan behind Rexster assigns vertex ids itself and ignores ids sent with a
/// creation request, which is why channels are addressed through the indexed
/// `uid` property instead.
///
/// # Example
///
/// ```ignore
/// use streambot_repository::{RexsterBackend, RexsterConfig};
///
/// let config = RexsterConfig::new("http://localhost:8182", "streambot")?;
/// let backend = RexsterBackend::new(config)?;
/// backend.check_ready().await?;
/// ```
pub struct RexsterBackend {
    client: Client,
    config: RexsterConfig,
}

impl RexsterBackend {
    /// Create a new Rexster backend.
    ///
    /// # Arguments
    ///
    /// * `config` - Server URL, graph name and request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(RexsterBackend)` - A new backend instance
    /// * `Err(StoreError)` - If the HTTP client cannot be built
    pub fn new(config: RexsterConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::unreachable(e.to_string()))?;

        info!(
            url = %config.base_url,
            graph = %config.graph,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "Created Rexster backend"
        );

        Ok(Self { client, config })
    }

    /// Send a request and decode the Rexster envelope.
    ///
    /// Transport failures become `BackendUnreachable`; non-success statuses
    /// and undecodable bodies become `BackendRejected`.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<RexsterResponse, StoreError> {
        let response = request.send().await.map_err(|e| {
            error!(operation, error = %e, "Rexster request failed");
            StoreError::unreachable(format!("{} request failed: {}", operation, e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::unreachable(format!("{} response unreadable: {}", operation, e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<RexsterResponse>(&body)
                .ok()
                .and_then(|r| r.error_message())
                .unwrap_or(body);
            error!(operation, status = %status, body = %message, "Rexster request rejected");
            return Err(StoreError::rejected(format!(
                "{} failed with status {}: {}",
                operation, status, message
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::rejected(format!("{} returned malformed response: {}", operation, e))
        })
    }
}

#[async_trait]
impl GraphBackend for RexsterBackend {
    async fn check_ready(&self) -> Result<(), StoreError> {
        let url = self.config.graph_url(&[]);
        self.send("check_ready", self.client.get(url)).await?;
        debug!(graph = %self.config.graph, "Rexster graph is available");
        Ok(())
    }

    async fn create_vertex(&self, properties: &PropertyMap) -> Result<Vertex, StoreError> {
        let url = self.config.graph_url(&["vertices"]);
        let response = self
            .send("create_vertex", self.client.post(url).json(properties))
            .await?;

        let mut vertices = response
            .into_elements()?
            .into_iter()
            .filter_map(Element::into_vertex);
        let vertex = vertices
            .next()
            .ok_or_else(|| StoreError::rejected("backend reported no created vertex"))?;

        debug!(handle = %vertex.handle, "Created vertex");
        Ok(vertex)
    }

    async fn query_vertices(&self, key: &str, value: &str) -> Result<Vec<Vertex>, StoreError> {
        let url = self.config.graph_url(&["vertices"]);
        let response = self
            .send(
                "query_vertices",
                self.client.get(url).query(&[("key", key), ("value", value)]),
            )
            .await?;

        response
            .into_elements()?
            .into_iter()
            .map(|element| {
                element
                    .into_vertex()
                    .ok_or_else(|| StoreError::rejected("vertex query returned an edge"))
            })
            .collect()
    }

    async fn eval(&self, script: &TraversalScript) -> Result<Vec<Element>, StoreError> {
        let url = self.config.graph_url(&["tp", "gremlin"]);
        let text = script.render();
        debug!(script = %text, "Evaluating Gremlin script");

        let response = self
            .send(
                script.name(),
                self.client.get(url).query(&[("script", text.as_str())]),
            )
            .await?;
        response.into_elements()
    }
}
