//! Static file serving module
//!
//! Serves the asset tree for every non-API `GET`: index files, MIME detection and `ETag`s.

use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Asset tree rooted at one directory
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_files: Vec<String>,
}

/// Outcome of mapping a request path onto the asset tree
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    File(PathBuf),
    /// Directory requested without its trailing slash
    AddSlash,
    NotFound,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, index_files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            index_files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `path` (without query) from the asset tree
    pub async fn serve(
        &self,
        path: &str,
        query: Option<&str>,
        if_none_match: Option<&str>,
    ) -> Response<Full<Bytes>> {
        match self.lookup(path).await {
            Lookup::File(file_path) => serve_file(&file_path, if_none_match).await,
            Lookup::AddSlash => {
                let target = query.map_or_else(|| format!("{path}/"), |q| format!("{path}/?{q}"));
                http::build_301_response(&target)
            }
            Lookup::NotFound => http::build_404_response(),
        }
    }

    async fn lookup(&self, path: &str) -> Lookup {
        let Some(relative) = relative_path(path) else {
            logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
            return Lookup::NotFound;
        };

        let root = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return Lookup::NotFound;
            }
        };

        let mut file_path = root.join(relative);
        let Ok(meta) = fs::metadata(&file_path).await else {
            return Lookup::NotFound;
        };

        if meta.is_dir() {
            if !path.ends_with('/') {
                return Lookup::AddSlash;
            }
            let mut index = None;
            for name in &self.index_files {
                let candidate = file_path.join(name);
                if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                    index = Some(candidate);
                    break;
                }
            }
            match index {
                Some(candidate) => file_path = candidate,
                None => return Lookup::NotFound,
            }
        }

        // Symlinks may still point outside the root
        let Ok(canonical) = fs::canonicalize(&file_path).await else {
            return Lookup::NotFound;
        };
        if !canonical.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                path,
                canonical.display()
            ));
            return Lookup::NotFound;
        }

        Lookup::File(canonical)
    }
}

/// Turn a URL path into a path relative to the root, `None` if it climbs out
///
/// Percent-escapes are decoded first, so an encoded `..` is caught like a literal one.
fn relative_path(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

async fn serve_file(file_path: &Path, if_none_match: Option<&str>) -> Response<Full<Bytes>> {
    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    http::build_file_response(Bytes::from(content), content_type, &etag)
}
