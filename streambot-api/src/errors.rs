//! Error types for the streambot API.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use streambot_repository::StoreError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error from the subscription service or the graph store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Store(e) => match e {
                StoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::DanglingReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::Inconsistent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                StoreError::BackendRejected(_) => StatusCode::BAD_GATEWAY,
                StoreError::BackendUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            warn!(status = %status, error = %self, "Request rejected");
        }

        (
            status,
            Json(json!({
                "status": "error",
                "message": self.to_string()
            })),
        )
            .into_response()
    }
}

/// Errors reported by the server lifecycle through its error sink.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Port 0 was requested; the service only listens on explicit ports.
    #[error("Invalid listen port {0}")]
    InvalidPort(u16),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The accept loop failed while the server was listening.
    #[error("Server failed while listening: {0}")]
    Serve(#[source] std::io::Error),

    /// `start` was called on a lifecycle that already left `Created`.
    #[error("Server was already started or stopped")]
    AlreadyStarted,
}

/// Errors that stop the binary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the graph store while wiring dependencies.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Error reported by the server lifecycle.
    #[error("Server error: {0}")]
    LifecycleError(#[from] LifecycleError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
