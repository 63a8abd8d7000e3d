//! Request metrics middleware.

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::counter;

use crate::metrics::{http as http_metrics, labels};

/// Count every request by route template, method and status.
///
/// The route template (`/v1/channels/:id`) is used instead of the raw path to
/// keep label cardinality bounded.
pub async fn record_request(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    counter!(
        http_metrics::REQUESTS_TOTAL,
        labels::ENDPOINT => endpoint,
        labels::METHOD => method,
        labels::STATUS => response.status().as_u16().to_string()
    )
    .increment(1);

    response
}
