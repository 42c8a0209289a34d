// Configuration module entry point
// Loads the gateway configuration once at startup; nothing here changes afterwards

mod types;

use hyper::Uri;
use std::net::SocketAddr;

pub use types::{
    BackendConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
    StaticFilesConfig,
};

/// Prefix for environment overrides, e.g. `DEVGATE_SERVER__PORT=5001`
const ENV_PREFIX: &str = "DEVGATE";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// A missing file is not an error, defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("backend.origin", "http://127.0.0.1:18080")?
            .set_default("backend.timeout_secs", 30)?
            .set_default("static_files.root", "webgui")?
            .set_default("static_files.index_files", vec!["index.html", "index.htm"])?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 75)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Parse `backend.origin` into a URI carrying only scheme and authority
    pub fn backend_origin(&self) -> Result<Uri, String> {
        let origin = self.backend.origin.trim_end_matches('/');
        let uri: Uri = origin
            .parse()
            .map_err(|e| format!("Invalid backend origin '{}': {e}", self.backend.origin))?;

        if uri.scheme_str() != Some("http") {
            return Err(format!(
                "Backend origin '{}' must use the http scheme",
                self.backend.origin
            ));
        }
        if uri.authority().is_none() {
            return Err(format!(
                "Backend origin '{}' has no host",
                self.backend.origin
            ));
        }
        if uri.path_and_query().is_some_and(|pq| pq.as_str() != "/") {
            return Err(format!(
                "Backend origin '{}' must not contain a path",
                self.backend.origin
            ));
        }

        Ok(uri)
    }

    /// Check the values that can only be judged together, before anything is bound
    pub fn validate(&self) -> Result<(), String> {
        let listen = self.socket_addr()?;
        let origin = self.backend_origin()?;

        let backend_port = origin.port_u16().unwrap_or(80);
        let backend_is_local = origin
            .host()
            .is_some_and(|h| is_local_host(h) || h == listen.ip().to_string());
        if backend_port == listen.port() && backend_is_local {
            return Err(format!(
                "Backend origin '{}' points at the gateway's own port {}",
                self.backend.origin,
                listen.port()
            ));
        }

        if self.backend.timeout_secs == 0 {
            return Err("backend.timeout_secs must be greater than 0".to_string());
        }
        let lifetime = self.performance.connection_timeout;
        if lifetime != 0 && lifetime <= self.backend.timeout_secs {
            return Err(format!(
                "performance.connection_timeout ({lifetime}s) must be 0 or longer than backend.timeout_secs ({}s)",
                self.backend.timeout_secs
            ));
        }
        if self.http.max_body_size == 0 {
            return Err("http.max_body_size must be greater than 0".to_string());
        }
        if self.static_files.index_files.is_empty() {
            return Err("static_files.index_files must list at least one file".to_string());
        }

        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    matches!(
        host,
        "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]" | "::1" | "[::]"
    )
}
