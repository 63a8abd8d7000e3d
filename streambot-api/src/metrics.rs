//! Metric name and label definitions.
//!
//! Handlers and the lifecycle emit through the `metrics` facade; the binary
//! does not install an exporter, so these are no-ops unless a recorder is
//! registered by the embedding process.

/// HTTP request metrics
pub mod http {
    /// Total number of HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "streambot_http_requests_total";
    /// Number of currently in-flight HTTP requests
    pub const REQUESTS_IN_FLIGHT: &str = "streambot_http_requests_in_flight";
}

/// Graph store call metrics
pub mod store {
    /// Duration of store calls in seconds
    pub const CALL_DURATION_SECONDS: &str = "streambot_store_call_duration_seconds";
    /// Total number of failed store calls
    pub const CALL_ERRORS_TOTAL: &str = "streambot_store_call_errors_total";
    /// Number of channels returned by a transitive subscriptions query
    pub const TRANSITIVE_RESULT_SIZE: &str = "streambot_store_transitive_result_size";
}

/// Common label keys
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const OPERATION: &str = "operation";
}
