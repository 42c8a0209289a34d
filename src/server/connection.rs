// Connection handling module
// Accepts a single TCP connection and serves it on its own task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};

use crate::config::PerformanceConfig;
use crate::handler::Router;
use crate::logger;

/// Idle sockets that never send a complete request head are closed after this long
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection settings, fixed at startup
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    /// `None` lets a connection live as long as the client keeps it open
    pub timeout: Option<Duration>,
    pub max_connections: Option<usize>,
    pub log_connections: bool,
}

impl ConnectionSettings {
    pub fn from_config(performance: &PerformanceConfig, log_connections: bool) -> Self {
        Self {
            keep_alive: performance.keep_alive,
            timeout: (performance.connection_timeout > 0)
                .then(|| Duration::from_secs(performance.connection_timeout)),
            max_connections: performance
                .max_connections
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            log_connections,
        }
    }
}

/// Decrements the active connection counter when the connection task ends
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforcing the connection limit, and serve it on a new task.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    router: &Arc<Router>,
    conn_counter: &Arc<AtomicUsize>,
    settings: &ConnectionSettings,
) {
    // Increment first, then check, so concurrent accepts cannot both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard(Arc::clone(conn_counter));

    if let Some(max_conn) = settings.max_connections {
        if prev_count >= max_conn {
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    if settings.log_connections {
        logger::log_connection_accepted(&peer_addr);
    }

    let router = Arc::clone(router);
    let settings = settings.clone();
    tokio::spawn(async move {
        let _guard = guard;
        serve_connection(stream, peer_addr, router, &settings).await;
    });
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
    settings: &ConnectionSettings,
) {
    let io = TokioIo::new(stream);

    let mut builder = http1::Builder::new();
    builder.keep_alive(settings.keep_alive);
    builder.timer(TokioTimer::new());
    builder.header_read_timeout(HEADER_READ_TIMEOUT);

    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            let router = Arc::clone(&router);
            async move {
                Ok::<_, std::convert::Infallible>(router.handle(req, peer_addr).await)
            }
        }),
    );
    tokio::pin!(conn);

    // Past the lifetime limit the connection stops taking new requests, but the one
    // in flight still gets its response
    let result = match settings.timeout {
        Some(limit) => {
            tokio::select! {
                result = conn.as_mut() => result,
                () = tokio::time::sleep(limit) => {
                    logger::log_warning(&format!(
                        "Connection from {peer_addr} reached its {} second limit, closing after the current request",
                        limit.as_secs()
                    ));
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            }
        }
        None => conn.await,
    };

    if let Err(err) = result {
        logger::log_connection_error(&err);
    }
}
