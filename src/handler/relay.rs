//! Backend relay module
//!
//! Performs exactly one exchange with the fixed backend per proxied request and turns
//! the outcome into the caller's response:
//!
//! - any completed HTTP exchange, whatever its status, is relayed with its status and body
//! - a transport failure (refused, reset, malformed reply, timeout) becomes a 502
//!
//! There is no retry: the outbound client keeps no idle connections and never replays
//! a request it could not send.

use crate::http::{self, response::JSON_CONTENT_TYPE};
use crate::logger;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Paths under this prefix are proxy-eligible
pub const API_PREFIX: &str = "/api/";

/// Stripped from the front of a proxied path, keeping the `/` that follows it
const STRIPPED_PREFIX: &str = "/api";

/// Why a backend exchange produced no HTTP response
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid backend target '{target}'")]
    InvalidTarget {
        target: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error("backend request failed")]
    Request(#[source] hyper_util::client::legacy::Error),
    #[error("failed to read backend response body")]
    Body(#[source] hyper::Error),
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl RelayError {
    /// Message with the full source chain, e.g. `backend request failed: ...: Connection refused`
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// Client side of the gateway, bound to one backend origin
#[derive(Clone)]
pub struct Relay {
    client: Client<HttpConnector, Full<Bytes>>,
    /// `scheme://authority`, no trailing slash
    origin: String,
    timeout: Duration,
}

impl Relay {
    /// `origin` must carry a scheme and an authority (see `Config::backend_origin`)
    pub fn new(origin: &Uri, timeout: Duration) -> Self {
        let origin = match (origin.scheme_str(), origin.authority()) {
            (Some(scheme), Some(authority)) => format!("{scheme}://{authority}"),
            _ => origin.to_string().trim_end_matches('/').to_string(),
        };

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .retry_canceled_requests(false)
            .build_http();

        Self {
            client,
            origin,
            timeout,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Backend URL for a proxied path-and-query, e.g. `/api/jobs?x=1` -> `<origin>/jobs?x=1`
    pub fn target_for(&self, path_and_query: &str) -> String {
        let stripped = path_and_query
            .strip_prefix(STRIPPED_PREFIX)
            .unwrap_or(path_and_query);
        format!("{}{stripped}", self.origin)
    }

    /// Forward one request and build the caller's response from the outcome
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        let target = self.target_for(path_and_query);

        match self.exchange(method.clone(), &target, body).await {
            Ok((status, body)) => http::build_relayed_response(status, body),
            Err(err) => {
                let reason = err.describe();
                logger::log_relay_failure(method.as_str(), &target, &reason);
                http::build_502_response(&reason)
            }
        }
    }

    /// Send the request and read the whole reply, bounded by the configured timeout
    async fn exchange(
        &self,
        method: Method,
        target: &str,
        body: Bytes,
    ) -> Result<(StatusCode, Bytes), RelayError> {
        let mut builder = Request::builder().method(method).uri(target);
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
        let request = builder
            .body(Full::new(body))
            .map_err(|source| RelayError::InvalidTarget {
                target: target.to_string(),
                source,
            })?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(RelayError::Request)?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(RelayError::Body)?
                .to_bytes();
            Ok::<_, RelayError>((status, body))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RelayError::Timeout(self.timeout))?
    }
}
