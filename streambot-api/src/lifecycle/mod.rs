//! Server lifecycle.
//!
//! `ServerLifecycle` owns the listener for one router and moves through
//! `Created -> Listening -> Draining -> Closed`. Startup and serving failures
//! are not returned to the caller of `start`; they are pushed into an error
//! sink so the process can react to them from one place.
//!
//! ```ignore
//! let (errors_tx, mut errors_rx) = mpsc::channel(1);
//! let lifecycle = ServerLifecycle::new(app, LifecycleConfig::default());
//! lifecycle.start(8080, errors_tx).await;
//!
//! tokio::select! {
//!     _ = tokio::signal::ctrl_c() => {}
//!     Some(e) = errors_rx.recv() => error!(error = %e, "Server failed"),
//! }
//! lifecycle.stop().await;
//! ```

mod accept;
pub mod in_flight;

pub use in_flight::{InFlight, InFlightGuard};

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::errors::LifecycleError;
use accept::Acceptor;

/// Default bound on how long `stop` waits for in-flight requests.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle states. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no listener yet.
    Created,
    /// Listener bound and accepting connections.
    Listening,
    /// No longer accepting; waiting for in-flight requests.
    Draining,
    /// Terminal. Reached after a drain, a failed start, or a stop before start.
    Closed,
}

/// Listener and drain settings.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Address to bind on.
    pub host: IpAddr,
    /// Upper bound for the drain in `stop`. `None` waits indefinitely.
    pub drain_timeout: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            drain_timeout: Some(DEFAULT_DRAIN_TIMEOUT),
        }
    }
}

/// The accept loop and the task watching it for panics.
struct ServeTask {
    watcher: JoinHandle<()>,
    abort: AbortHandle,
}

struct Inner {
    config: LifecycleConfig,
    state: watch::Sender<LifecycleState>,
    router: Mutex<Option<Router>>,
    serve_task: Mutex<Option<ServeTask>>,
    local_addr: Mutex<Option<SocketAddr>>,
    in_flight: InFlight,
}

/// Start/stop sequencing for an HTTP server.
///
/// Clones share the same lifecycle, so `stop` can be called from any task
/// (a signal watcher, an error handler) while another awaits `closed`.
#[derive(Clone)]
pub struct ServerLifecycle {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Push an error into the sink without waiting. The sink has a single slot;
/// when it is already full the error is only logged.
fn report(errors: &mpsc::Sender<LifecycleError>, error: LifecycleError) {
    error!(error = %error, "Server lifecycle error");
    if let Err(e) = errors.try_send(error) {
        warn!(error = %e, "Error sink unavailable, dropping lifecycle error");
    }
}

impl ServerLifecycle {
    /// Wrap `router` with in-flight tracking and prepare it for `start`.
    pub fn new(router: Router, config: LifecycleConfig) -> Self {
        let in_flight = InFlight::new();
        let router = router.layer(axum::middleware::from_fn_with_state(
            in_flight.clone(),
            in_flight::track_in_flight,
        ));
        let (state, _) = watch::channel(LifecycleState::Created);

        Self {
            inner: Arc::new(Inner {
                config,
                state,
                router: Mutex::new(Some(router)),
                serve_task: Mutex::new(None),
                local_addr: Mutex::new(None),
                in_flight,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Address the listener is bound to, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.inner.local_addr)
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    /// Bind `port` and start serving on a spawned task.
    ///
    /// Never fails to the caller. A zero port or a bind failure is sent to
    /// `errors` and the lifecycle goes straight to `Closed`. Once listening,
    /// a listener failure or a panic in the accept loop is sent to `errors`
    /// once; the lifecycle stays `Listening` until `stop`.
    pub async fn start(&self, port: u16, errors: mpsc::Sender<LifecycleError>) {
        let Some(router) = self.take_router() else {
            report(&errors, LifecycleError::AlreadyStarted);
            return;
        };

        if port == 0 {
            report(&errors, LifecycleError::InvalidPort(port));
            self.close();
            return;
        }

        let addr = SocketAddr::new(self.inner.config.host, port);
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                report(&errors, LifecycleError::Bind { addr, source });
                self.close();
                return;
            }
        };
        let bound = listener.local_addr().unwrap_or(addr);

        self.launch(listener, bound, router, errors);
    }

    fn take_router(&self) -> Option<Router> {
        let mut slot = lock(&self.inner.router);
        if self.state() != LifecycleState::Created {
            return None;
        }
        slot.take()
    }

    /// Spawn the accept loop, then publish `Listening`.
    fn launch<A: Acceptor>(
        &self,
        acceptor: A,
        addr: SocketAddr,
        router: Router,
        errors: mpsc::Sender<LifecycleError>,
    ) {
        let accept_loop = tokio::spawn(accept::run(
            acceptor,
            router,
            self.inner.state.subscribe(),
            errors.clone(),
        ));
        let abort = accept_loop.abort_handle();
        let watcher = tokio::spawn(async move {
            if let Err(e) = accept_loop.await {
                if e.is_panic() {
                    let source = io::Error::other(format!("accept loop panicked: {}", e));
                    report(&errors, LifecycleError::Serve(source));
                }
            }
        });

        // Stored before `Listening` is visible, so a `stop` that sees
        // `Listening` always finds the task to drain.
        *lock(&self.inner.serve_task) = Some(ServeTask { watcher, abort });

        let listening = self.inner.state.send_if_modified(|state| {
            if *state == LifecycleState::Created {
                *state = LifecycleState::Listening;
                true
            } else {
                false
            }
        });
        if !listening {
            // The accept loop sees `Closed` and releases the listener.
            debug!(addr = %addr, "Stopped while binding, releasing listener");
            return;
        }
        *lock(&self.inner.local_addr) = Some(addr);

        info!(addr = %addr, "Server listening");
    }

    /// Stop accepting, drain in-flight requests, and close.
    ///
    /// Safe to call repeatedly and from several tasks at once: one caller
    /// drains, the others wait for `Closed`. Calling before `start` closes
    /// the lifecycle without binding anything.
    pub async fn stop(&self) {
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            previous = Some(*state);
            match *state {
                LifecycleState::Listening => {
                    *state = LifecycleState::Draining;
                    true
                }
                LifecycleState::Created => {
                    *state = LifecycleState::Closed;
                    true
                }
                LifecycleState::Draining | LifecycleState::Closed => false,
            }
        });

        match previous {
            Some(LifecycleState::Listening) => self.drain().await,
            Some(LifecycleState::Created) => info!("Server stopped before listening"),
            _ => {}
        }

        self.closed().await;
    }

    /// Resolves once the lifecycle is `Closed`.
    pub async fn closed(&self) {
        let mut state_rx = self.inner.state.subscribe();
        let _ = state_rx
            .wait_for(|state| *state == LifecycleState::Closed)
            .await;
    }

    async fn drain(&self) {
        info!(
            in_flight = self.inner.in_flight.count(),
            "Server draining"
        );

        let task = lock(&self.inner.serve_task).take();
        let abort = task.as_ref().map(|task| task.abort.clone());
        let drained = async {
            if let Some(task) = task {
                if let Err(e) = task.watcher.await {
                    warn!(error = %e, "Serve task ended abnormally");
                }
            }
            self.inner.in_flight.wait_idle().await;
        };

        match self.inner.config.drain_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, drained).await.is_err() {
                    warn!(
                        timeout_secs = limit.as_secs(),
                        in_flight = self.inner.in_flight.count(),
                        "Drain timed out, abandoning remaining requests"
                    );
                    if let Some(abort) = abort {
                        abort.abort();
                    }
                }
            }
            None => drained.await,
        }

        self.close();
    }

    fn close(&self) {
        self.inner.state.send_replace(LifecycleState::Closed);
        info!("Server closed");
    }
}
