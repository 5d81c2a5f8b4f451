//! Security response headers.
//!
//! Adds a fixed set of hardening headers to every response, including
//! short-circuits and normalized errors. A header the response already
//! carries is left untouched.

use http::header::{self, HeaderName};
use http::HeaderValue;
use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::{Request, Response};

/// Default `Content-Security-Policy`.
pub const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

/// Default `Strict-Transport-Security` (180 days).
pub const DEFAULT_HSTS: &str = "max-age=15552000; includeSubDomains";

/// Security headers middleware.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for SecurityHeadersMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityHeadersMiddleware {
    /// Creates the stage with the default header set.
    #[must_use]
    pub fn new() -> Self {
        let headers = vec![
            (
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(DEFAULT_CSP),
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("origin-agent-cluster"),
                HeaderValue::from_static("?1"),
            ),
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(DEFAULT_HSTS),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            (
                header::X_DNS_PREFETCH_CONTROL,
                HeaderValue::from_static("off"),
            ),
            (
                HeaderName::from_static("x-download-options"),
                HeaderValue::from_static("noopen"),
            ),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
        ];

        Self { headers }
    }

    /// Replaces the `Content-Security-Policy` value.
    #[must_use]
    pub fn content_security_policy(self, policy: HeaderValue) -> Self {
        self.set(header::CONTENT_SECURITY_POLICY, policy)
    }

    /// Adds or replaces one header in the set.
    #[must_use]
    pub fn set(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value));
        self
    }

    /// Adds the header set to `response`, keeping any value it already has.
    ///
    /// Also used outside the pipeline for responses produced at the boundary.
    pub fn apply(&self, response: &mut Response) {
        let headers = response.headers_mut();
        headers.remove("x-powered-by");
        for (name, value) in &self.headers {
            headers.entry(name).or_insert_with(|| value.clone());
        }
    }

    /// Drops one header from the set.
    #[must_use]
    pub fn without(mut self, name: &HeaderName) -> Self {
        self.headers.retain(|(n, _)| n != name);
        self
    }
}

impl Middleware for SecurityHeadersMiddleware {
    fn name(&self) -> &'static str {
        Stage::SecurityHeaders.name()
    }

    fn on_request<'a>(
        &'a self,
        _ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move { Ok(Flow::Continue(request)) })
    }

    fn on_response(&self, _ctx: &MiddlewareContext, response: &mut Response) {
        self.apply(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use http::StatusCode;

    #[test]
    fn test_adds_default_headers() {
        let mw = SecurityHeadersMiddleware::new();
        let ctx = MiddlewareContext::new();
        let mut response = Response::empty(StatusCode::NOT_FOUND);

        mw.on_response(&ctx, &mut response);

        let h = response.headers();
        assert_eq!(h.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(h.get("x-frame-options").unwrap(), "SAMEORIGIN");
        assert_eq!(h.get("referrer-policy").unwrap(), "no-referrer");
        assert_eq!(h.get("x-dns-prefetch-control").unwrap(), "off");
        assert_eq!(h.get("x-download-options").unwrap(), "noopen");
        assert_eq!(h.get("x-permitted-cross-domain-policies").unwrap(), "none");
        assert_eq!(h.get("cross-origin-opener-policy").unwrap(), "same-origin");
        assert_eq!(h.get("cross-origin-resource-policy").unwrap(), "same-origin");
        assert_eq!(h.get("strict-transport-security").unwrap(), DEFAULT_HSTS);
        assert!(h.get("content-security-policy").is_some());
    }

    #[test]
    fn test_existing_headers_not_overwritten() {
        let mw = SecurityHeadersMiddleware::new();
        let ctx = MiddlewareContext::new();
        let mut response = Response::empty(StatusCode::OK);
        response
            .headers_mut()
            .insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        response
            .headers_mut()
            .insert("x-powered-by", HeaderValue::from_static("something"));

        mw.on_response(&ctx, &mut response);

        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert!(response.headers().get("x-powered-by").is_none());
    }

    #[test]
    fn test_customization() {
        let mw = SecurityHeadersMiddleware::new()
            .content_security_policy(HeaderValue::from_static("default-src 'none'"))
            .without(&header::STRICT_TRANSPORT_SECURITY);
        let ctx = MiddlewareContext::new();
        let mut response = Response::empty(StatusCode::OK);

        mw.on_response(&ctx, &mut response);

        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
        assert!(response.headers().get("strict-transport-security").is_none());
    }
}
