//! Dependency initialization and wiring for the streambot API.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use streambot_repository::{
    GraphBackend, GraphStore, GraphStoreConfig, MemoryGraph, RexsterBackend, RexsterConfig,
    SubscriptionService,
};
use tokio::time::sleep;
use tracing::{info, warn};

use super::parse_or;
use crate::errors::AppError;

/// Default Rexster server URL.
const DEFAULT_REXSTER_URL: &str = "http://localhost:8182";

/// Default Rexster graph name.
const DEFAULT_REXSTER_GRAPH: &str = "graph";

/// Default Rexster request timeout in seconds.
const DEFAULT_REXSTER_TIMEOUT_SECS: u64 = 10;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for the graph backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if the backend is not ready.
    FailFast,
    /// Retry at a fixed interval until the backend is ready.
    Retry,
}

impl ConnectionMode {
    /// Parse connection mode from `BACKEND_CONNECTION_MODE`.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive)
    /// Defaults to "retry" if not set or invalid.
    fn from_env() -> Self {
        Self::parse(&env::var("BACKEND_CONNECTION_MODE").unwrap_or_else(|_| "retry".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid BACKEND_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Which graph backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Rexster server speaking Gremlin over HTTP.
    Rexster,
    /// Process-local graph, for development. Data is lost on exit.
    Memory,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.to_lowercase().as_str() {
            "rexster" => Ok(Self::Rexster),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::config(format!(
                "Unknown GRAPH_BACKEND `{}`, expected `rexster` or `memory`",
                other
            ))),
        }
    }
}

/// Store settings from the raw `TRAVERSAL_MAX_DEPTH` value. A depth of 0 is
/// raised to 1.
fn store_config(max_depth: Option<String>) -> Result<GraphStoreConfig, AppError> {
    let default = GraphStoreConfig::default().max_traversal_depth;
    let depth = parse_or("TRAVERSAL_MAX_DEPTH", max_depth, default)?;
    Ok(GraphStoreConfig::with_max_traversal_depth(depth))
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The service handlers call into.
    pub service: Arc<SubscriptionService>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GRAPH_BACKEND`: "rexster" or "memory" (default: rexster)
    /// - `REXSTER_URL`: Rexster server URL (default: http://localhost:8182)
    /// - `REXSTER_GRAPH`: Graph name on the Rexster server (default: graph)
    /// - `REXSTER_TIMEOUT_SECS`: Per-request timeout towards Rexster (default: 10)
    /// - `TRAVERSAL_MAX_DEPTH`: Hop bound for transitive subscriptions (default: 5)
    /// - `BACKEND_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `BACKEND_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - On invalid configuration, or an unready backend in fail-fast mode
    pub async fn new() -> Result<Self, AppError> {
        let kind = BackendKind::parse(
            &env::var("GRAPH_BACKEND").unwrap_or_else(|_| "rexster".to_string()),
        )?;
        let max_depth = store_config(env::var("TRAVERSAL_MAX_DEPTH").ok())?;

        let backend: Arc<dyn GraphBackend> = match kind {
            BackendKind::Memory => {
                warn!("Using in-memory graph backend, data will not be persisted");
                Arc::new(MemoryGraph::new())
            }
            BackendKind::Rexster => Arc::new(Self::connect_to_rexster().await?),
        };

        info!(
            backend = ?kind,
            max_traversal_depth = max_depth.max_traversal_depth,
            "Graph backend ready"
        );

        let store = GraphStore::with_config(backend, max_depth);
        Ok(Self {
            service: Arc::new(SubscriptionService::new(store)),
        })
    }

    /// Build the Rexster backend and wait for it according to the connection mode.
    async fn connect_to_rexster() -> Result<RexsterBackend, AppError> {
        let url = env::var("REXSTER_URL").unwrap_or_else(|_| DEFAULT_REXSTER_URL.to_string());
        let graph =
            env::var("REXSTER_GRAPH").unwrap_or_else(|_| DEFAULT_REXSTER_GRAPH.to_string());
        let timeout = parse_or(
            "REXSTER_TIMEOUT_SECS",
            env::var("REXSTER_TIMEOUT_SECS").ok(),
            DEFAULT_REXSTER_TIMEOUT_SECS,
        )?;
        let mode = ConnectionMode::from_env();
        let retry_interval = parse_or(
            "BACKEND_RETRY_INTERVAL_SECS",
            env::var("BACKEND_RETRY_INTERVAL_SECS").ok(),
            DEFAULT_RETRY_INTERVAL_SECS,
        )?;

        info!(
            rexster_url = %url,
            graph = %graph,
            connection_mode = ?mode,
            retry_interval_secs = retry_interval,
            "Initializing Rexster backend"
        );

        let config = RexsterConfig::new(&url, graph)?
            .with_request_timeout(Duration::from_secs(timeout));
        let backend = RexsterBackend::new(config)?;

        Self::wait_until_ready(&backend, mode, Duration::from_secs(retry_interval)).await?;
        Ok(backend)
    }

    /// Probe the backend until it answers, or once in fail-fast mode.
    async fn wait_until_ready(
        backend: &dyn GraphBackend,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<(), AppError> {
        loop {
            match backend.check_ready().await {
                Ok(()) => return Ok(()),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(AppError::config(format!(
                            "Graph backend is not ready: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Graph backend is not ready, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
