//! Request body parsing.
//!
//! Collects the body and decodes it by content type:
//!
//! | Content type | Result |
//! |---|---|
//! | `application/json`, `*/*+json` | [`ParsedBody::Json`] |
//! | `application/x-www-form-urlencoded` | [`ParsedBody::Form`] |
//! | anything else with a body | [`ParsedBody::Raw`] |
//!
//! A body that does not decode as its declared type is a 400 fault. Bodies
//! over the size limit are a 413 fault. The request continues with its
//! original bytes either way.

use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::Request;

/// Default body size limit (100 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParsedBody {
    /// No body was sent.
    #[default]
    Empty,
    /// A JSON document.
    Json(Value),
    /// URL-encoded form fields, in order.
    Form(Vec<(String, String)>),
    /// Undecoded bytes of any other content type.
    Raw(Bytes),
}

impl ParsedBody {
    /// The JSON value, if the body was JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// First form field named `name`.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Body parsing middleware.
#[derive(Debug, Clone)]
pub struct BodyParserMiddleware {
    limit: usize,
}

impl Default for BodyParserMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyParserMiddleware {
    /// Creates the stage with the default size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Overrides the size limit in bytes.
    #[must_use]
    pub const fn limit(mut self, bytes: usize) -> Self {
        self.limit = bytes;
        self
    }

    fn decode(content_type: Option<&str>, bytes: &Bytes) -> Result<ParsedBody, ErrorRecord> {
        if bytes.is_empty() {
            return Ok(ParsedBody::Empty);
        }

        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if essence == "application/json" || essence.ends_with("+json") {
            serde_json::from_slice(bytes)
                .map(ParsedBody::Json)
                .map_err(|e| {
                    ErrorRecord::bad_request(format!("Malformed JSON body: {e}"))
                        .with_trace(format!("{e:?}"))
                })
        } else if essence == "application/x-www-form-urlencoded" {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
                .map(ParsedBody::Form)
                .map_err(|e| {
                    ErrorRecord::bad_request(format!("Malformed form body: {e}"))
                        .with_trace(format!("{e:?}"))
                })
        } else {
            Ok(ParsedBody::Raw(bytes.clone()))
        }
    }
}

impl Middleware for BodyParserMiddleware {
    fn name(&self) -> &'static str {
        Stage::BodyParsing.name()
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            if bytes.len() > self.limit {
                return Err(ErrorRecord::bad_request(format!(
                    "Request body of {} bytes exceeds the {} byte limit",
                    bytes.len(),
                    self.limit
                ))
                .with_status(StatusCode::PAYLOAD_TOO_LARGE));
            }

            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            ctx.set_body(Self::decode(content_type, &bytes)?);

            Ok(Flow::Continue(Request::from_parts(parts, Full::new(bytes))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::ErrorKind;

    fn request(content_type: &str, body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/api/cart")
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn run(mw: &BodyParserMiddleware, req: Request) -> (MiddlewareContext, Result<Flow, ErrorRecord>) {
        let mut ctx = MiddlewareContext::new();
        let result = mw.on_request(&mut ctx, req).await;
        (ctx, result)
    }

    #[tokio::test]
    async fn test_json_body() {
        let mw = BodyParserMiddleware::new();
        let (ctx, result) = run(&mw, request("application/json; charset=utf-8", r#"{"qty":2}"#)).await;

        let Flow::Continue(req) = result.unwrap() else {
            panic!("expected continue");
        };
        assert_eq!(ctx.body().as_json().unwrap()["qty"], 2);

        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"qty":2}"#);
    }

    #[tokio::test]
    async fn test_form_body() {
        let mw = BodyParserMiddleware::new();
        let (ctx, result) = run(
            &mw,
            request("application/x-www-form-urlencoded", "email=a%40b.com&remember=on"),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(ctx.body().form_field("email"), Some("a@b.com"));
        assert_eq!(ctx.body().form_field("remember"), Some("on"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let mw = BodyParserMiddleware::new();
        let (_, result) = run(&mw, request("application/json", "{not json")).await;

        let record = result.unwrap_err();
        assert_eq!(record.kind(), ErrorKind::BadRequest);
        assert_eq!(record.status(), StatusCode::BAD_REQUEST);
        assert!(record.message().starts_with("Malformed JSON body"));
    }

    #[tokio::test]
    async fn test_other_content_type_kept_raw() {
        let mw = BodyParserMiddleware::new();
        let (ctx, result) = run(&mw, request("text/plain", "hello")).await;

        assert!(result.is_ok());
        assert_eq!(ctx.body(), &ParsedBody::Raw(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let mw = BodyParserMiddleware::new();
        let (ctx, result) = run(&mw, request("application/json", "")).await;

        assert!(result.is_ok());
        assert_eq!(ctx.body(), &ParsedBody::Empty);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let mw = BodyParserMiddleware::new().limit(4);
        let (_, result) = run(&mw, request("text/plain", "too long")).await;

        let record = result.unwrap_err();
        assert_eq!(record.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
