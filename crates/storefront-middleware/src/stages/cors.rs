//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! The storefront runs a permissive policy: any origin, a fixed list of
//! request headers and methods. The headers go on every response, and any
//! `OPTIONS` request is answered immediately with `200` and an empty body.

use http::{HeaderValue, Method, StatusCode};
use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Standard CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
}

/// Default allowed request headers.
pub const DEFAULT_ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Default allowed methods.
pub const DEFAULT_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// CORS policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
    allow_methods: HeaderValue,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsConfig {
    /// Any origin, the default header and method lists.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
            allow_methods: HeaderValue::from_static(DEFAULT_ALLOW_METHODS),
        }
    }

    /// Restricts the allowed origin to a single value.
    #[must_use]
    pub fn allow_origin(mut self, origin: HeaderValue) -> Self {
        self.allow_origin = origin;
        self
    }

    /// Writes the CORS headers onto `response`, replacing any present.
    pub fn apply(&self, response: &mut Response) {
        let h = response.headers_mut();
        h.insert(headers::ALLOW_ORIGIN, self.allow_origin.clone());
        h.insert(headers::ALLOW_HEADERS, self.allow_headers.clone());
        h.insert(headers::ALLOW_METHODS, self.allow_methods.clone());
    }

    /// The `200`, empty-body answer to an `OPTIONS` request.
    #[must_use]
    pub fn preflight_response(&self) -> Response {
        let mut response = Response::empty(StatusCode::OK);
        self.apply(&mut response);
        response
    }
}

/// CORS middleware.
#[derive(Debug, Clone, Default)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    /// Creates the stage with the given policy.
    #[must_use]
    pub const fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// The configured policy.
    #[must_use]
    pub const fn config(&self) -> &CorsConfig {
        &self.config
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        Stage::Cors.name()
    }

    fn on_request<'a>(
        &'a self,
        _ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move {
            if request.method() == Method::OPTIONS {
                return Ok(Flow::Respond(Response::empty(StatusCode::OK)));
            }
            Ok(Flow::Continue(request))
        })
    }

    fn on_response(&self, _ctx: &MiddlewareContext, response: &mut Response) {
        self.config.apply(response);
    }
}
