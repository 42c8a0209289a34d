//! Request handler module
//!
//! Routing of inbound requests to the backend relay or the asset tree.

pub mod relay;
pub mod router;
pub mod static_files;

pub use relay::{Relay, RelayError, API_PREFIX};
pub use router::{Route, Router};
pub use static_files::StaticFiles;
