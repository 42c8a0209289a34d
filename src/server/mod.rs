// Server module entry point
// Listener creation, per-connection tasks and the accept loop

pub mod connection;
pub mod listener;
pub mod server_loop;
pub mod signal;

pub use connection::ConnectionSettings;
pub use listener::create_listener;
pub use server_loop::run_server;
pub use signal::shutdown_signal;
