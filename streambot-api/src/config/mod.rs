//! Server settings and dependency wiring.

pub mod dependencies;

pub use dependencies::{BackendKind, ConnectionMode, Dependencies};

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use crate::errors::AppError;
use crate::lifecycle::LifecycleConfig;

/// Default bind address.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default prefix for the channel routes.
pub const DEFAULT_BASE_PATH: &str = "/v1";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default drain bound in seconds.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub base_path: String,
    pub request_timeout: Duration,
    pub drain_timeout: Option<Duration>,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SERVER_HOST`: Bind address (default: 0.0.0.0)
    /// - `SERVER_PORT`: Listen port (default: 8080)
    /// - `SERVER_BASE_PATH`: Prefix for channel routes (default: /v1)
    /// - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 10)
    /// - `DRAIN_TIMEOUT_SECS`: Shutdown drain bound, 0 waits indefinitely (default: 30)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());
        let host = host
            .parse::<IpAddr>()
            .map_err(|e| AppError::config(format!("Invalid SERVER_HOST `{}`: {}", host, e)))?;

        let port = parse_or("SERVER_PORT", lookup("SERVER_PORT"), DEFAULT_SERVER_PORT)?;
        let request_timeout = parse_or(
            "REQUEST_TIMEOUT_SECS",
            lookup("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let drain_timeout = parse_or(
            "DRAIN_TIMEOUT_SECS",
            lookup("DRAIN_TIMEOUT_SECS"),
            DEFAULT_DRAIN_TIMEOUT_SECS,
        )?;

        let base_path = lookup("SERVER_BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

        Ok(Self {
            host,
            port,
            base_path: normalize_base_path(&base_path),
            request_timeout: Duration::from_secs(request_timeout.max(1)),
            drain_timeout: (drain_timeout > 0).then(|| Duration::from_secs(drain_timeout)),
        })
    }

    /// Lifecycle settings derived from these server settings.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            host: self.host,
            drain_timeout: self.drain_timeout,
        }
    }
}

pub(crate) fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::config(format!("Invalid {} `{}`: {}", key, raw, e))),
    }
}

/// `v1/` and `/v1` both become `/v1`; `/` and the empty string become empty.
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
