//! Centralized error normalization.
//!
//! Every fault raised in the pipeline, including an unmatched route, ends
//! here as an [`ErrorRecord`] and leaves as exactly one response:
//!
//! - API-style requests get `{"error": {"message": ..., "stack"?: ...}}`
//! - browser requests get the rendered `error` view
//!
//! A request is API-style when it carries `X-Requested-With: XMLHttpRequest`,
//! targets `/api/...`, or its `Accept` header ranks JSON above HTML.
//! Traces are always logged but only reach the client when details are
//! exposed (outside production).

use std::fmt;
use std::sync::Arc;

use http::{header, HeaderMap, StatusCode};
use serde_json::{json, Value};
use storefront_core::{ErrorRecord, ViewRenderer, ERROR_VIEW};

use crate::context::MiddlewareContext;
use crate::types::{Response, ResponseExt};

/// Turns fault records into responses.
#[derive(Clone, Default)]
pub struct ErrorNormalizer {
    expose_details: bool,
    renderer: Option<Arc<dyn ViewRenderer>>,
}

impl fmt::Debug for ErrorNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNormalizer")
            .field("expose_details", &self.expose_details)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl ErrorNormalizer {
    /// A normalizer that hides traces and renders error pages as plain text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders browser error pages through `renderer`.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Includes traces in client responses. Off in production.
    #[must_use]
    pub const fn expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    /// True if traces reach clients.
    #[must_use]
    pub const fn exposes_details(&self) -> bool {
        self.expose_details
    }

    /// Normalizes the synthesized not-found fault.
    #[must_use]
    pub fn not_found(&self, ctx: &MiddlewareContext) -> Option<Response> {
        self.normalize(ctx, ErrorRecord::not_found())
    }

    /// Builds the response for `record`.
    ///
    /// Returns `None`, after logging, when the request was already answered.
    #[must_use]
    pub fn normalize(&self, ctx: &MiddlewareContext, record: ErrorRecord) -> Option<Response> {
        let record = match record.method() {
            Some(_) => record,
            None => record.with_origin(ctx.method().clone(), ctx.path()),
        };

        if ctx.response_state().is_sent() {
            tracing::warn!(
                request_id = %ctx.request_id(),
                http.status_code = record.status().as_u16(),
                error = %record.message(),
                "response already sent, suppressing error response"
            );
            return None;
        }

        log_fault(ctx, &record);

        let response = if is_api_request(ctx.path(), ctx.headers()) {
            self.json_response(&record)
        } else {
            self.page_response(ctx, &record)
        };
        Some(response)
    }

    fn stack<'r>(&self, record: &'r ErrorRecord) -> Option<&'r str> {
        if self.expose_details {
            record.trace()
        } else {
            None
        }
    }

    fn json_response(&self, record: &ErrorRecord) -> Response {
        let mut error = json!({ "message": record.message() });
        if let Some(stack) = self.stack(record) {
            error["stack"] = Value::String(stack.to_string());
        }
        Response::json(record.status(), &json!({ "error": error }))
    }

    fn page_response(&self, ctx: &MiddlewareContext, record: &ErrorRecord) -> Response {
        let status = record.status();
        let title = status.canonical_reason().unwrap_or("Error");

        let Some(renderer) = &self.renderer else {
            return Response::text(status, format!("{title}: {}", record.message()));
        };

        let mut model = json!({
            "title": title,
            "message": record.message(),
            "status": status.as_u16(),
        });
        if let Some(stack) = self.stack(record) {
            model["stack"] = Value::String(stack.to_string());
        }

        match renderer.render(ERROR_VIEW, &model) {
            Ok(html) => Response::html(status, html),
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "failed to render error page");
                Response::text(status, format!("{title}: {}", record.message()))
            }
        }
    }
}

fn log_fault(ctx: &MiddlewareContext, record: &ErrorRecord) {
    let method = record.method().map_or("-", |m| m.as_str());
    let path = record.path().unwrap_or("-");
    let trace = record.trace().unwrap_or("");

    if record.status() >= StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(
            request_id = %ctx.request_id(),
            http.method = method,
            http.path = path,
            http.status_code = record.status().as_u16(),
            error.kind = record.kind().as_str(),
            error = %record.message(),
            trace,
            "request failed"
        );
    } else {
        tracing::warn!(
            request_id = %ctx.request_id(),
            http.method = method,
            http.path = path,
            http.status_code = record.status().as_u16(),
            error.kind = record.kind().as_str(),
            error = %record.message(),
            trace,
            "request rejected"
        );
    }
}

/// True if the error should be answered with JSON.
#[must_use]
pub fn is_api_request(path: &str, headers: &HeaderMap) -> bool {
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

    xhr || path.starts_with("/api/") || prefers_json(headers)
}

/// True if the `Accept` header ranks JSON strictly above HTML.
fn prefers_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mut html = 0.0_f32;
    let mut json = 0.0_f32;

    for entry in accept.split(',') {
        let mut parts = entry.split(';');
        let media = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);

        match media.as_str() {
            "text/html" | "text/*" => html = html.max(quality),
            "application/json" | "application/*" => json = json.max(quality),
            "*/*" => {
                html = html.max(quality);
                json = json.max(quality);
            }
            _ => {}
        }
    }

    json > html
}
