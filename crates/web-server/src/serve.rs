//! Connection handling for the HTTP listener.
//!
//! `axum::serve` gives no control over per-connection timeouts, so connections
//! are driven here through `hyper_util`'s auto (HTTP/1 + HTTP/2) builder:
//!
//! - a client must finish sending a request head within the read timeout;
//! - a keep-alive connection with no request in flight is closed once it has
//!   been quiet for the idle timeout.
//!
//! The per-request (write) bound lives in the router, see `crate::router`.

use axum::Router;
use configuration::ServerSettings;
use hyper::{body::Incoming, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto::Builder,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Per-connection time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    /// Time allowed to receive a complete request head.
    pub read: Duration,
    /// Time a connection may stay open with nothing in flight.
    pub idle: Duration,
}

impl From<&ServerSettings> for ConnectionTimeouts {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            read: settings.read_timeout(),
            idle: settings.idle_timeout(),
        }
    }
}

/// Accepts connections until `signal` resolves, then asks every open
/// connection to finish its current request and waits for them all.
pub async fn serve<F>(listener: TcpListener, app: Router, timeouts: ConnectionTimeouts, signal: F)
where
    F: Future<Output = ()>,
{
    let shutdown = CancellationToken::new();
    let mut connections = JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            () = &mut signal => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    connections.spawn(serve_connection(
                        stream,
                        remote,
                        app.clone(),
                        timeouts,
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    // Usually fd exhaustion; back off instead of spinning.
                    tracing::warn!(error = %e, "Failed to accept connection.");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    shutdown.cancel();
    tracing::info!(open = connections.len(), "Draining open connections.");
    while connections.join_next().await.is_some() {}
}

/// Tracks whether a connection has a request in flight and when it last did.
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    last_active_ms: AtomicU64,
}

impl Activity {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_active_ms: AtomicU64::new(0),
        })
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        InFlight(Arc::clone(self))
    }

    fn touch(&self) {
        let now = self.opened.elapsed().as_millis() as u64;
        self.last_active_ms.store(now, Ordering::SeqCst);
    }

    /// How long the connection has been quiet, or `None` while a request is
    /// being handled.
    fn idle_for(&self) -> Option<Duration> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::SeqCst));
        Some(self.opened.elapsed().saturating_sub(last))
    }
}

struct InFlight(Arc<Activity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    timeouts: ConnectionTimeouts,
    shutdown: CancellationToken,
) {
    let activity = Activity::new();
    let service = {
        let activity = Arc::clone(&activity);
        hyper::service::service_fn(move |request: Request<Incoming>| {
            let in_flight = activity.begin();
            let app = app.clone();
            async move {
                let response = app.oneshot(request).await;
                drop(in_flight);
                response
            }
        })
    };

    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read)
        .keep_alive(true);
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let mut idle_check = tokio::time::interval((timeouts.idle / 4).max(Duration::from_millis(10)));
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut closing = false;

    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(%remote, error = %e, "Connection ended with an error.");
                }
                break;
            }
            () = shutdown.cancelled(), if !closing => {
                closing = true;
                connection.as_mut().graceful_shutdown();
            }
            _ = idle_check.tick(), if !closing => {
                if activity.idle_for().is_some_and(|quiet| quiet >= timeouts.idle) {
                    tracing::debug!(%remote, "Closing idle connection.");
                    closing = true;
                    connection.as_mut().graceful_shutdown();
                }
            }
        }
    }
}
