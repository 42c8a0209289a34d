//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the static-file side and the backend relay.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_301_response, build_304_response, build_400_response, build_404_response,
    build_413_response, build_502_response, build_file_response, build_options_response,
    build_relayed_response,
};
