//! Server lifecycle tests over real sockets.

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use serde_json::json;
use streambot_api::server::create_app;
use streambot_api::{LifecycleConfig, LifecycleError, LifecycleState, ServerLifecycle};
use streambot_repository::{GraphStore, MemoryGraph, SubscriptionService};
use tokio::sync::{mpsc, Notify};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config(drain_timeout: Option<Duration>) -> LifecycleConfig {
    LifecycleConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        drain_timeout,
    }
}

/// Router whose `/slow` handler signals `entered` and then waits for `release`.
fn slow_router(entered: Arc<Notify>, release: Arc<Notify>) -> Router {
    Router::new().route(
        "/slow",
        get(move || {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            async move {
                entered.notify_one();
                release.notified().await;
                "done"
            }
        }),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn port_zero_reports_startup_error_and_closes() {
    let lifecycle = ServerLifecycle::new(Router::new(), config(None));
    let (tx, mut rx) = mpsc::channel(1);

    lifecycle.start(0, tx).await;

    assert!(matches!(rx.recv().await, Some(LifecycleError::InvalidPort(0))));
    assert_eq!(lifecycle.state(), LifecycleState::Closed);
    assert!(lifecycle.local_addr().is_none());
    tokio::time::timeout(Duration::from_secs(1), lifecycle.closed())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_waits_for_slow_request() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let lifecycle = ServerLifecycle::new(
        slow_router(entered.clone(), release.clone()),
        config(Some(Duration::from_secs(10))),
    );
    let port = free_port();
    let (tx, mut rx) = mpsc::channel(1);

    lifecycle.start(port, tx).await;
    assert_eq!(lifecycle.state(), LifecycleState::Listening);

    let url = format!("http://127.0.0.1:{}/slow", port);
    let request = tokio::spawn(async move { reqwest::get(url).await?.text().await });
    entered.notified().await;
    assert_eq!(lifecycle.in_flight().count(), 1);

    let stopper = tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move { lifecycle.stop().await }
    });
    let mut states = lifecycle.subscribe();
    states
        .wait_for(|state| *state == LifecycleState::Draining)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!stopper.is_finished());
    assert_eq!(lifecycle.state(), LifecycleState::Draining);

    release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), stopper)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(request.await.unwrap().unwrap(), "done");
    assert_eq!(lifecycle.state(), LifecycleState::Closed);
    assert_eq!(lifecycle.in_flight().count(), 0);
    assert!(rx.try_recv().is_err());

    let refused = reqwest::get(format!("http://127.0.0.1:{}/slow", port)).await;
    assert!(refused.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drain_timeout_bounds_stop() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let lifecycle = ServerLifecycle::new(
        slow_router(entered.clone(), release.clone()),
        config(Some(Duration::from_millis(200))),
    );
    let port = free_port();
    let (tx, _rx) = mpsc::channel(1);
    lifecycle.start(port, tx).await;

    let url = format!("http://127.0.0.1:{}/slow", port);
    let _request = tokio::spawn(async move { reqwest::get(url).await });
    entered.notified().await;

    tokio::time::timeout(Duration::from_secs(5), lifecycle.stop())
        .await
        .unwrap();

    assert_eq!(lifecycle.state(), LifecycleState::Closed);
    release.notify_one();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_stops_all_complete() {
    let lifecycle = ServerLifecycle::new(Router::new(), config(Some(Duration::from_secs(5))));
    let (tx, _rx) = mpsc::channel(1);
    lifecycle.start(free_port(), tx).await;
    assert_eq!(lifecycle.state(), LifecycleState::Listening);

    let stops: Vec<_> = (0..4)
        .map(|_| {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.stop().await })
        })
        .collect();
    for stop in stops {
        tokio::time::timeout(Duration::from_secs(5), stop)
            .await
            .unwrap()
            .unwrap();
    }

    assert_eq!(lifecycle.state(), LifecycleState::Closed);
    lifecycle.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_start_is_rejected() {
    let lifecycle = ServerLifecycle::new(Router::new(), config(Some(Duration::from_secs(5))));
    let (tx, _rx) = mpsc::channel(1);
    lifecycle.start(free_port(), tx).await;

    let (tx, mut rx) = mpsc::channel(1);
    lifecycle.start(free_port(), tx).await;

    assert!(matches!(rx.recv().await, Some(LifecycleError::AlreadyStarted)));
    assert_eq!(lifecycle.state(), LifecycleState::Listening);
    lifecycle.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serves_api_over_http() {
    let graph = Arc::new(MemoryGraph::new());
    let service = Arc::new(SubscriptionService::new(GraphStore::new(graph)));
    let app = create_app(service, "/v1", Duration::from_secs(10));
    let lifecycle = ServerLifecycle::new(app, config(Some(Duration::from_secs(5))));
    let port = free_port();
    let (tx, _rx) = mpsc::channel(1);
    lifecycle.start(port, tx).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}/v1", port);

    let created = client
        .put(format!("{}/channels", base))
        .json(&json!({ "name": "alpha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);
    let id = created.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let fetched = client
        .get(format!("{}/channels/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), reqwest::StatusCode::OK);
    assert_eq!(
        fetched.json::<serde_json::Value>().await.unwrap(),
        json!({ "id": id, "name": "alpha" })
    );

    lifecycle.stop().await;
    assert_eq!(lifecycle.state(), LifecycleState::Closed);
}
