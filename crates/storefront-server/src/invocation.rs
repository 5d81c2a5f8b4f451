//! Invocation adapter.
//!
//! The boundary between the HTTP server and the pipeline. One call to
//! [`InvocationAdapter::invoke`] per request:
//!
//! 1. `OPTIONS` is answered here, before the pipeline is entered.
//! 2. The pipeline runs under a panic guard.
//! 3. A panic, or a pipeline that delivered nothing, yields the last-resort
//!    `500` JSON body.
//! 4. Delivery goes through a one-shot [`Responder`]; later sends are
//!    refused and logged.
//!
//! Responses made here rather than in the pipeline still get the security
//! and CORS headers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::{Method, StatusCode};
use serde_json::json;
use storefront_core::ErrorRecord;
use storefront_middleware::stages::{CorsConfig, SecurityHeadersMiddleware};
use storefront_middleware::{MiddlewareContext, Pipeline, Request, Responder, Response, ResponseExt};

/// Message of the last-resort response.
pub const LAST_RESORT_MESSAGE: &str = "Internal Server Error";

/// Runs one request through the pipeline and always produces a response.
#[derive(Debug, Clone)]
pub struct InvocationAdapter {
    pipeline: Arc<Pipeline>,
    cors: CorsConfig,
    security: SecurityHeadersMiddleware,
    expose_details: bool,
}

impl InvocationAdapter {
    /// Wraps `pipeline`.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cors: CorsConfig::permissive(),
            security: SecurityHeadersMiddleware::new(),
            expose_details: false,
        }
    }

    /// Sets the CORS policy used for boundary `OPTIONS` answers.
    #[must_use]
    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Sets the security headers added to boundary responses.
    #[must_use]
    pub fn security_headers(mut self, security: SecurityHeadersMiddleware) -> Self {
        self.security = security;
        self
    }

    /// Includes panic details in last-resort bodies. Off in production.
    #[must_use]
    pub const fn expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    /// The wrapped pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Produces the response for `request`.
    pub async fn invoke(&self, request: Request) -> Response {
        if request.method() == Method::OPTIONS {
            return self.finish(self.cors.preflight_response());
        }

        let (responder, mut receiver) = Responder::channel();
        let mut ctx = MiddlewareContext::with_responder(responder.clone());

        let outcome = AssertUnwindSafe(self.pipeline.process(&mut ctx, request))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let detail = panic_message(panic.as_ref());
            tracing::error!(
                request_id = %ctx.request_id(),
                http.method = %ctx.method(),
                http.path = %ctx.path(),
                panic = %detail,
                "request pipeline panicked"
            );
            self.deliver(&responder, &ctx, self.last_resort(&detail));
        }

        if let Some(response) = receiver.try_recv() {
            return response;
        }

        tracing::error!(request_id = %ctx.request_id(), "pipeline delivered no response");
        self.last_resort("pipeline delivered no response")
    }

    /// Answers a request that failed before it could enter the pipeline,
    /// such as an unreadable or oversized body.
    ///
    /// The fault goes through the pipeline's error normalizer, so it gets the
    /// same JSON or HTML contract as any other fault.
    pub fn reject(&self, parts: http::request::Parts, record: ErrorRecord) -> Response {
        let request = http::Request::from_parts(parts, http_body_util::Full::default());
        let mut ctx = MiddlewareContext::new();
        ctx.record_request(&request);

        match self.pipeline.normalizer().normalize(&ctx, record) {
            Some(response) => self.finish(response),
            None => self.last_resort("rejected request produced no response"),
        }
    }

    fn finish(&self, mut response: Response) -> Response {
        self.cors.apply(&mut response);
        self.security.apply(&mut response);
        response
    }

    fn deliver(&self, responder: &Responder, ctx: &MiddlewareContext, response: Response) {
        if let Err(e) = responder.send(response) {
            tracing::warn!(
                request_id = %ctx.request_id(),
                error = %e,
                "response already sent, dropping last-resort response"
            );
        }
    }

    /// The last-resort `500` response.
    #[must_use]
    pub fn last_resort(&self, detail: &str) -> Response {
        let mut error = json!({ "message": LAST_RESORT_MESSAGE });
        if self.expose_details {
            error["stack"] = json!(detail);
        }
        self.finish(Response::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "error": error }),
        ))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string())
}
