//! Local development gateway
//!
//! Serves a static asset tree and relays everything under `/api/` to one backend,
//! so a browser client and its backend appear as a single origin.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
