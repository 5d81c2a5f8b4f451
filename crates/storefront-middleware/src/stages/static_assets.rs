//! Static asset serving.
//!
//! `GET` and `HEAD` requests whose path names a file under the static root
//! are answered here and never reach the router. Everything else continues
//! down the chain, including paths that are refused for safety:
//!
//! - any `..` component
//! - any hidden component (leading `.`)
//! - anything that resolves outside the root after following symlinks
//!
//! Responses carry `Content-Type` by extension, a weak `ETag`,
//! `Last-Modified` and `Cache-Control`, and honour `If-None-Match` and
//! `If-Modified-Since` with `304 Not Modified`.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use storefront_core::ErrorRecord;
use thiserror::Error;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Why a path was not served.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// No file at that path.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path is refused (traversal, hidden file, outside root).
    #[error("Forbidden path: {0}")]
    Forbidden(String),

    /// Only GET and HEAD are served.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Reading an existing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StaticFileError {
    /// True when the request should simply continue down the chain.
    #[must_use]
    pub const fn is_pass_through(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Static file server rooted at one directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: Option<String>,
    cache_control: HeaderValue,
}

impl StaticFiles {
    /// Serves files under `root`, with `index.html` for directories.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: Some("index.html".to_string()),
            cache_control: HeaderValue::from_static("public, max-age=0"),
        }
    }

    /// Sets or disables the directory index file.
    #[must_use]
    pub fn index(mut self, index: Option<&str>) -> Self {
        self.index_file = index.map(str::to_string);
        self
    }

    /// Sets the `Cache-Control` value.
    #[must_use]
    pub fn cache_control(mut self, value: HeaderValue) -> Self {
        self.cache_control = value;
        self
    }

    /// The configured root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serves `request_path` if it names a file under the root.
    pub async fn handle(
        &self,
        request_path: &str,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let mut file_path = self.resolve_path(request_path).await?;

        if tokio::fs::metadata(&file_path).await?.is_dir() {
            let index = self
                .index_file
                .as_deref()
                .map(|index| file_path.join(index))
                .ok_or_else(|| StaticFileError::NotFound(request_path.to_string()))?;
            match tokio::fs::metadata(&index).await {
                Ok(meta) if meta.is_file() => file_path = index,
                _ => return Err(StaticFileError::NotFound(request_path.to_string())),
            }
        }

        self.serve_file(&file_path, headers, method).await
    }

    async fn resolve_path(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let relative = request_path.trim_start_matches('/');

        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(
                        "Directory traversal not allowed".to_string(),
                    ));
                }
                Component::Normal(name) if name.to_string_lossy().starts_with('.') => {
                    return Err(StaticFileError::Forbidden(
                        "Hidden files not allowed".to_string(),
                    ));
                }
                Component::Normal(_) | Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StaticFileError::Forbidden(
                        "Absolute paths not allowed".to_string(),
                    ));
                }
            }
        }

        let canonical_root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        let canonical = tokio::fs::canonicalize(self.root.join(relative))
            .await
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;

        if !canonical.starts_with(&canonical_root) {
            return Err(StaticFileError::Forbidden(
                "Path escapes root directory".to_string(),
            ));
        }

        Ok(canonical)
    }

    async fn serve_file(
        &self,
        path: &Path,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = metadata.modified().ok();
        let etag = modified.and_then(|m| generate_etag(metadata.len(), m));

        if is_not_modified(headers, etag.as_deref(), modified) {
            let mut response = Response::empty(StatusCode::NOT_MODIFIED);
            self.add_cache_headers(&mut response, etag.as_deref(), modified);
            return Ok(response);
        }

        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(tokio::fs::read(path).await?)
        };

        let mut response = Response::new(Full::new(body));
        let h = response.headers_mut();
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static(detect_mime_type(path)));
        h.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        self.add_cache_headers(&mut response, etag.as_deref(), modified);
        Ok(response)
    }

    fn add_cache_headers(&self, response: &mut Response, etag: Option<&str>, modified: Option<SystemTime>) {
        let h = response.headers_mut();
        h.insert(header::CACHE_CONTROL, self.cache_control.clone());
        if let Some(value) = etag.and_then(|e| HeaderValue::from_str(e).ok()) {
            h.insert(header::ETAG, value);
        }
        if let Some(value) = modified.and_then(|m| HeaderValue::from_str(&httpdate::fmt_http_date(m)).ok()) {
            h.insert(header::LAST_MODIFIED, value);
        }
    }
}

fn generate_etag(size: u64, modified: SystemTime) -> Option<String> {
    let millis = modified.duration_since(SystemTime::UNIX_EPOCH).ok()?.as_millis();
    Some(format!("W/\"{size:x}-{millis:x}\""))
}

fn is_not_modified(headers: &HeaderMap, etag: Option<&str>, modified: Option<SystemTime>) -> bool {
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        // If-None-Match takes precedence over If-Modified-Since
        return etag.is_some_and(|etag| {
            if_none_match
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || candidate == etag)
        });
    }

    let since = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok());

    match (since, modified) {
        (Some(since), Some(modified)) => {
            let secs = |t: SystemTime| {
                t.duration_since(SystemTime::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default()
            };
            secs(modified) <= secs(since)
        }
        _ => false,
    }
}

/// Content type for a file, by extension.
#[must_use]
pub fn detect_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

/// Static asset middleware.
#[derive(Debug, Clone)]
pub struct StaticAssetsMiddleware {
    files: StaticFiles,
}

impl StaticAssetsMiddleware {
    /// Serves files under `root`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_files(StaticFiles::new(root))
    }

    /// Uses a customised file server.
    #[must_use]
    pub const fn with_files(files: StaticFiles) -> Self {
        Self { files }
    }
}

impl Middleware for StaticAssetsMiddleware {
    fn name(&self) -> &'static str {
        Stage::StaticAssets.name()
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move {
            let result = self
                .files
                .handle(request.uri().path(), request.headers(), request.method())
                .await;

            match result {
                Ok(response) => Ok(Flow::Respond(response)),
                Err(e) if e.is_pass_through() => {
                    if matches!(e, StaticFileError::Forbidden(_)) {
                        tracing::debug!(request_id = %ctx.request_id(), path = %request.uri().path(), reason = %e, "static path refused");
                    }
                    Ok(Flow::Continue(request))
                }
                Err(e) => Err(ErrorRecord::internal(format!("Failed to read static file: {e}"))
                    .with_trace(format!("{e:?}"))),
            }
        })
    }
}
