// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::{accept_connection, ConnectionSettings};
use crate::handler::Router;
use crate::logger;

/// Run the accept loop on an already bound listener.
///
/// Accept errors are logged and the loop keeps going; only `shutdown` ends it.
/// Connections already being served finish on their own tasks.
pub async fn run_server(
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
    shutdown: impl Future<Output = ()>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &router,
                            &active_connections,
                            &settings,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_server_stop();
                break;
            }
        }
    }
}
