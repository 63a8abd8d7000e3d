// HTTP request handlers
use std::future::Future;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics::{counter, histogram};
use streambot_repository::StoreError;
use streambot_shared::{Channel, ExternalId};
use tracing::{debug, info};

use crate::errors::ApiError;
use crate::metrics::{labels, store as store_metrics};
use crate::models::{CreateChannelRequest, CreateChannelResponse, SubscribeRequest};
use crate::server::state::AppState;

/// Run a store call, recording its duration and failures under `operation`.
async fn timed<T, F>(operation: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let started = Instant::now();
    let result = call.await;
    let elapsed = started.elapsed();

    histogram!(store_metrics::CALL_DURATION_SECONDS, labels::OPERATION => operation)
        .record(elapsed.as_secs_f64());
    if result.is_err() {
        counter!(store_metrics::CALL_ERRORS_TOTAL, labels::OPERATION => operation).increment(1);
    }
    debug!(
        operation,
        duration_ms = elapsed.as_millis() as u64,
        "Store call finished"
    );

    result
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "streambot-api is running")
}

/// `PUT /channels` - create a channel and answer with its id
pub async fn put_channel(
    State(state): State<AppState>,
    payload: Result<Json<CreateChannelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateChannelResponse>), ApiError> {
    let Json(request) = payload?;

    let id = timed("save_channel", state.service.create_channel(&request.name)).await?;

    info!(id = %id, name = %request.name, "Created channel");
    Ok((StatusCode::CREATED, Json(CreateChannelResponse { id })))
}

/// `GET /channels/:id` - fetch one channel
pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Channel>, ApiError> {
    let id = ExternalId::new(id);
    let channel = timed("get_channel", state.service.get_channel(&id)).await?;
    Ok(Json(channel))
}

/// `POST /channels/:id/subscriptions` - subscribe `:id` to `channel_id`
pub async fn post_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let from = ExternalId::new(id);
    let to = ExternalId::new(request.channel_id);

    timed(
        "save_subscription",
        state.service.subscribe(&from, &to, request.created_at),
    )
    .await?;

    info!(
        from = %from,
        to = %to,
        created_at = request.created_at,
        "Saved subscription"
    );
    Ok(StatusCode::OK)
}

/// `GET /channels/:id/subscriptions` - channels reachable through subscriptions
pub async fn get_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Channel>>, ApiError> {
    let id = ExternalId::new(id);
    let channels = timed(
        "get_transitive_subscriptions",
        state.service.transitive_subscriptions(&id),
    )
    .await?;

    histogram!(store_metrics::TRANSITIVE_RESULT_SIZE).record(channels.len() as f64);
    debug!(id = %id, count = channels.len(), "Fetched transitive subscriptions");

    Ok(Json(channels))
}
