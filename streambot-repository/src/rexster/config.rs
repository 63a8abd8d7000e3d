use std::time::Duration;
use url::Url;

use crate::errors::StoreError;

/// Default per-request timeout toward Rexster.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Rexster server.
#[derive(Debug, Clone)]
pub struct RexsterConfig {
    /// Root URL of the Rexster REST API (e.g. "http://localhost:8182").
    pub base_url: Url,
    /// Name of the graph the channels live in.
    pub graph: String,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
}

impl RexsterConfig {
    /// Create a new Rexster configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Rexster server URL
    /// * `graph` - The graph name
    ///
    /// # Returns
    ///
    /// * `Ok(RexsterConfig)` - With the default request timeout
    /// * `Err(StoreError::BackendUnreachable)` - If the URL cannot address a server
    pub fn new(base_url: &str, graph: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::unreachable(format!("invalid Rexster URL `{}`: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::unreachable(format!(
                "invalid Rexster URL `{}`: not a base URL",
                base_url
            )));
        }

        let graph = graph.into();
        if graph.is_empty() {
            return Err(StoreError::validation("Rexster graph name is required"));
        }

        Ok(Self {
            base_url,
            graph,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// URL of `graphs/{graph}/{segments...}` below the base URL.
    pub(crate) fn graph_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("graphs").push(&self.graph).extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_url() {
        let config = RexsterConfig::new("http://localhost:8182", "streambot").unwrap();

        assert_eq!(
            config.graph_url(&["vertices"]).as_str(),
            "http://localhost:8182/graphs/streambot/vertices"
        );
        assert_eq!(
            config.graph_url(&["tp", "gremlin"]).as_str(),
            "http://localhost:8182/graphs/streambot/tp/gremlin"
        );
        assert_eq!(
            config.graph_url(&[]).as_str(),
            "http://localhost:8182/graphs/streambot"
        );
    }

    #[test]
    fn test_graph_url_keeps_base_path() {
        let config = RexsterConfig::new("http://db.internal:8182/rexster/", "g").unwrap();

        assert_eq!(
            config.graph_url(&["vertices"]).as_str(),
            "http://db.internal:8182/rexster/graphs/g/vertices"
        );
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            RexsterConfig::new("not a url", "g"),
            Err(StoreError::BackendUnreachable(_))
        ));
        assert!(matches!(
            RexsterConfig::new("mailto:ops@example.com", "g"),
            Err(StoreError::BackendUnreachable(_))
        ));
        assert!(matches!(
            RexsterConfig::new("http://localhost:8182", ""),
            Err(StoreError::ValidationError(_))
        ));
    }
}
