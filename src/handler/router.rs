//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: answers preflights, sends `/api/*` to the
//! backend relay, serves everything else from the asset tree, and writes the access log.

use crate::config::Config;
use crate::handler::relay::{Relay, API_PREFIX};
use crate::handler::static_files::StaticFiles;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, CONTENT_LENGTH, IF_NONE_MATCH, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Where a request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// CORS preflight, answered locally
    Preflight,
    /// Forwarded to the backend
    Relay,
    /// Served from the asset tree
    Static,
    /// No meaning for this method/path combination
    NotFound,
}

impl Route {
    /// Classify a request by method and path (query excluded)
    pub fn classify(method: &Method, path: &str) -> Self {
        let proxied = path.starts_with(API_PREFIX);
        match *method {
            Method::OPTIONS => Self::Preflight,
            Method::GET if proxied => Self::Relay,
            Method::GET => Self::Static,
            Method::POST | Method::PUT | Method::DELETE if proxied => Self::Relay,
            _ => Self::NotFound,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Static => "static",
            Self::Preflight | Self::NotFound => "local",
        }
    }
}

/// Dispatches every request of every connection; immutable once built
pub struct Router {
    relay: Relay,
    assets: StaticFiles,
    max_body_size: u64,
    access_log: bool,
    access_log_format: String,
}

impl Router {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let origin = config.backend_origin()?;
        Ok(Self {
            relay: Relay::new(&origin, Duration::from_secs(config.backend.timeout_secs)),
            assets: StaticFiles::new(
                &config.static_files.root,
                config.static_files.index_files.clone(),
            ),
            max_body_size: config.http.max_body_size,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        })
    }

    pub const fn assets(&self) -> &StaticFiles {
        &self.assets
    }

    /// Main entry point for HTTP request handling; always yields exactly one response
    pub async fn handle<B>(&self, req: Request<B>, remote_addr: SocketAddr) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let started = Instant::now();
        let entry = self
            .access_log
            .then(|| access_entry(&req, remote_addr));

        let route = Route::classify(req.method(), req.uri().path());
        let response = self.dispatch(route, req).await;

        if let Some(mut entry) = entry {
            entry.status = response.status().as_u16();
            entry.body_bytes = response
                .body()
                .size_hint()
                .exact()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0);
            entry.upstream = route.label();
            entry.request_time_us =
                u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            logger::log_access(&entry, &self.access_log_format);
        }

        response
    }

    async fn dispatch<B>(&self, route: Route, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        match route {
            Route::Preflight => http::build_options_response(),
            Route::NotFound => http::build_404_response(),
            Route::Static => {
                let uri = req.uri();
                let if_none_match = req
                    .headers()
                    .get(IF_NONE_MATCH)
                    .and_then(|v| v.to_str().ok());
                self.assets
                    .serve(uri.path(), uri.query(), if_none_match)
                    .await
            }
            Route::Relay => self.relay_request(req).await,
        }
    }

    async fn relay_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        if let Some(resp) = check_body_size(&req, self.max_body_size) {
            return resp;
        }

        let (parts, body) = req.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());

        let limit = usize::try_from(self.max_body_size).unwrap_or(usize::MAX);
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                logger::log_error(&format!(
                    "Request body too large for {path_and_query} (max: {} bytes)",
                    self.max_body_size
                ));
                return http::build_413_response();
            }
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to read request body for {path_and_query}: {e}"
                ));
                return http::build_400_response();
            }
        };

        self.relay
            .forward(parts.method.clone(), path_and_query, body)
            .await
    }
}

/// Reject a declared Content-Length above the limit before reading anything
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size = req
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;
    if size > max_body_size {
        logger::log_error(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return Some(http::build_413_response());
    }
    None
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
