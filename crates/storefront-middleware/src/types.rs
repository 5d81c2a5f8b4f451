//! HTTP request and response types used throughout the pipeline.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// Constructors for the response shapes the storefront produces.
///
/// None of these can fail: a status plus a static content type always forms
/// a valid response.
pub trait ResponseExt {
    /// Plain-text body.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// HTML body.
    fn html(status: StatusCode, body: impl Into<String>) -> Response;

    /// JSON body.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// Empty body.
    fn empty(status: StatusCode) -> Response;

    /// `302 Found` to `location`.
    fn redirect(location: &str) -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        with_body(status, TEXT_PLAIN, Bytes::from(body.into()))
    }

    fn html(status: StatusCode, body: impl Into<String>) -> Response {
        with_body(status, TEXT_HTML, Bytes::from(body.into()))
    }

    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        with_body(status, APPLICATION_JSON, Bytes::from(body.to_string()))
    }

    fn empty(status: StatusCode) -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn redirect(location: &str) -> Response {
        let mut response = Self::empty(StatusCode::FOUND);
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
        response.headers_mut().insert(header::LOCATION, value);
        response
    }
}

fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
