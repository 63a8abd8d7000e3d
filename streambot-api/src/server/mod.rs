// Server module - HTTP routing and middleware
pub mod handlers;
pub mod middleware;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, put};
use axum::Router;
use streambot_repository::SubscriptionService;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use self::state::AppState;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the axum application router with all routes and middleware.
///
/// Channel routes live under `base_path` (for example `/v1`); `/health` is
/// always served at the root. An empty base path or `/` mounts the channel
/// routes at the root as well.
pub fn create_app(
    service: Arc<SubscriptionService>,
    base_path: &str,
    request_timeout: Duration,
) -> Router {
    let state = AppState { service };

    let channels = Router::new()
        .route("/channels", put(handlers::put_channel))
        .route("/channels/:id", get(handlers::get_channel))
        .route(
            "/channels/:id/subscriptions",
            get(handlers::get_subscriptions).post(handlers::post_subscription),
        );

    let router = match base_path.trim_end_matches('/') {
        "" => Router::new().merge(channels),
        path => Router::new().nest(path, channels),
    };

    router
        .route("/health", get(handlers::health_check))
        .layer(axum::middleware::from_fn(middleware::record_request))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
