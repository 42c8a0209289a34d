//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devgate::config::Config;
use devgate::handler::Router;
use devgate::server;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request as the stub backend saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw TCP backend answering every connection through a closure
pub struct StubBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubBackend {
    /// `reply` maps each request to `Some((status, body))`, or `None` to hang up without answering
    pub async fn start<F>(reply: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Option<(u16, Vec<u8>)> + Send + Sync + 'static,
    {
        Self::start_delayed(|_| Duration::ZERO, reply).await
    }

    /// Like `start`, but waits `delay(request)` before answering
    pub async fn start_delayed<D, F>(delay: D, reply: F) -> Self
    where
        D: Fn(&RecordedRequest) -> Duration + Send + Sync + 'static,
        F: Fn(&RecordedRequest) -> Option<(u16, Vec<u8>)> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let delay = Arc::new(delay);
        let reply = Arc::new(reply);

        let (calls_task, requests_task) = (Arc::clone(&calls), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                calls_task.fetch_add(1, Ordering::SeqCst);
                let delay = Arc::clone(&delay);
                let reply = Arc::clone(&reply);
                let requests = Arc::clone(&requests_task);
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let wait = delay(&request);
                    let answer = reply(&request);
                    requests.lock().unwrap().push(request);
                    tokio::time::sleep(wait).await;
                    if let Some((status, body)) = answer {
                        let _ = socket.write_all(&raw_response(status, &body)).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            addr,
            calls,
            requests,
        }
    }

    /// Backend that always answers with the same status and body
    pub async fn fixed(status: u16, body: &'static str) -> Self {
        Self::start(move |_| Some((status, body.as_bytes().to_vec()))).await
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn raw_response(status: u16, body: &[u8]) -> Vec<u8> {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut out = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Read one HTTP/1.1 request (head plus `Content-Length` body)
async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(body_start + content_length);

    Some(RecordedRequest {
        method,
        target,
        headers,
        body: buf[body_start..body_end].to_vec(),
    })
}

/// An address nothing is listening on
pub async fn closed_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Start a gateway relaying to `origin` and serving `asset_root`; returns its address
pub async fn start_gateway(origin: &str, asset_root: &Path) -> SocketAddr {
    start_gateway_with(origin, asset_root, |_| {}).await
}

pub async fn start_gateway_with(
    origin: &str,
    asset_root: &Path,
    adjust: impl FnOnce(&mut Config),
) -> SocketAddr {
    let mut cfg = Config::load_from("does-not-exist").unwrap();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = 0;
    cfg.backend.origin = origin.to_string();
    cfg.backend.timeout_secs = 5;
    cfg.static_files.root = asset_root.to_string_lossy().to_string();
    cfg.logging.access_log = false;
    adjust(&mut cfg);

    let listener = server::create_listener(cfg.socket_addr().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Arc::new(Router::from_config(&cfg).unwrap());
    let settings = server::ConnectionSettings::from_config(&cfg.performance, false);

    tokio::spawn(server::run_server(
        listener,
        router,
        settings,
        std::future::pending::<()>(),
    ));
    addr
}

/// Asset root with an index page and one script
pub fn asset_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>UniBot</h1>").unwrap();
    std::fs::write(dir.path().join("script.js"), "const API_BASE = '/api';").unwrap();
    dir
}

pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Send one request to the gateway on a fresh connection
pub async fn send(
    gateway: SocketAddr,
    method: Method,
    path: &str,
    body: &[u8],
) -> GatewayResponse {
    let client: Client<HttpConnector, Full<Bytes>> = Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(0)
        .build_http();

    let mut builder = Request::builder()
        .method(method)
        .uri(format!("http://{gateway}{path}"));
    if !body.is_empty() {
        builder = builder.header("content-type", "application/json");
    }
    let req = builder
        .body(Full::new(Bytes::copy_from_slice(body)))
        .unwrap();

    let resp = client.request(req).await.expect("gateway unreachable");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    GatewayResponse {
        status,
        headers,
        body,
    }
}
