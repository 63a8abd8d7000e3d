//! In-flight request tracking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics::gauge;
use tokio::sync::Notify;

use crate::metrics::http as http_metrics;

#[derive(Debug, Default)]
struct Counter {
    active: AtomicUsize,
    idle: Notify,
}

/// Counts requests currently being handled and lets a drain wait for zero.
///
/// Cloning is cheap; clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: Arc<Counter>,
}

/// Marks one request as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Counter>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request. The returned guard releases it on drop.
    pub fn enter(&self) -> InFlightGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        gauge!(http_metrics::REQUESTS_IN_FLIGHT).increment(1.0);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of requests currently in flight.
    pub fn count(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wait until no request is in flight. Returns immediately when idle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the check and the
            // await is not missed.
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(http_metrics::REQUESTS_IN_FLIGHT).decrement(1.0);
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Middleware holding an `InFlightGuard` for the duration of each request.
pub async fn track_in_flight(
    State(in_flight): State<InFlight>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = in_flight.enter();
    next.run(request).await
}
