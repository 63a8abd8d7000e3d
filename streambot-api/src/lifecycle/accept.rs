//! Accept loop behind `ServerLifecycle`.
//!
//! Connections are served with hyper directly, so an accept failure that is
//! not a per-connection error ends the loop and reaches the error sink.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::debug;

use super::{report, LifecycleState};
use crate::errors::LifecycleError;

/// Source of accepted connections.
pub(crate) trait Acceptor: Send + 'static {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Io, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Io = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(&*self)
    }
}

fn is_stopping(state: &LifecycleState) -> bool {
    matches!(state, LifecycleState::Draining | LifecycleState::Closed)
}

/// Errors that concern one peer only; the listener itself is still usable.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Accept until the lifecycle starts stopping or the acceptor fails.
///
/// A failure is reported to `errors` as soon as it happens. Either way the
/// acceptor is dropped first, then the loop waits for open connections to
/// finish, which they do gracefully once the lifecycle is stopping. Aborting
/// the task running this drops those connections.
pub(crate) async fn run<A: Acceptor>(
    mut acceptor: A,
    router: Router,
    mut state: watch::Receiver<LifecycleState>,
    errors: mpsc::Sender<LifecycleError>,
) {
    let mut connections = JoinSet::new();

    loop {
        let accepted = tokio::select! {
            _ = state.wait_for(is_stopping) => break,
            accepted = acceptor.accept() => accepted,
        };

        match accepted {
            Ok((io, remote)) => {
                connections.spawn(serve_connection(io, remote, router.clone(), state.clone()));
            }
            Err(e) if is_connection_error(&e) => {
                debug!(error = %e, "Dropped connection before accept");
            }
            Err(e) => {
                report(&errors, LifecycleError::Serve(e));
                break;
            }
        }

        while connections.try_join_next().is_some() {}
    }

    drop(acceptor);
    debug!(open = connections.len(), "Listener released");
    while connections.join_next().await.is_some() {}
}

async fn serve_connection<I>(
    io: I,
    remote: SocketAddr,
    router: Router,
    mut state: watch::Receiver<LifecycleState>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let builder = Builder::new(TokioExecutor::new());
    let connection =
        builder.serve_connection_with_upgrades(TokioIo::new(io), TowerToHyperService::new(router));
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(e) = result {
                debug!(remote = %remote, error = %e, "Connection error");
            }
            return;
        }
        _ = state.wait_for(is_stopping) => {}
    }

    connection.as_mut().graceful_shutdown();
    if let Err(e) = connection.await {
        debug!(remote = %remote, error = %e, "Connection error while draining");
    }
}
