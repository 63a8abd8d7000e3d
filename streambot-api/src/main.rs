//! Streambot API Entry Point
//!
//! Serves the channel and subscription HTTP API on top of a Rexster graph
//! (or an in-memory graph for local development).

use dotenv::dotenv;
use std::env;
use streambot_api::{server, AppError, Dependencies, ServerLifecycle, Settings};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), AppError> {
    let debug = env::var("STREAMBOT_DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_filter = if debug {
        "streambot_api=debug,streambot_repository=debug,tower_http=debug"
    } else {
        "streambot_api=info,streambot_repository=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
    };
    result.map_err(|e| AppError::config(format!("Failed to initialize tracing: {}", e)))?;

    info!(
        service_name = "streambot-api",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting streambot API");

    let settings = Settings::from_env()?;

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let app = server::create_app(deps.service, &settings.base_path, settings.request_timeout);
    let lifecycle = ServerLifecycle::new(app, settings.lifecycle_config());

    tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal");
                    lifecycle.stop().await;
                }
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        }
    });

    info!(
        port = settings.port,
        base_path = %settings.base_path,
        "Starting server"
    );
    let (errors_tx, mut errors_rx) = mpsc::channel(1);
    lifecycle.start(settings.port, errors_tx).await;

    let failure = tokio::select! {
        _ = lifecycle.closed() => None,
        Some(e) = errors_rx.recv() => Some(e),
    };
    // A failed start closes the lifecycle and fills the sink at once.
    let failure = failure.or_else(|| errors_rx.try_recv().ok());

    match failure {
        Some(e) => {
            error!(error = %e, "Server failed, shutting down");
            lifecycle.stop().await;
            Err(e.into())
        }
        None => {
            info!("Streambot API stopped");
            Ok(())
        }
    }
}
