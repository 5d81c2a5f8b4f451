//! Access logging.
//!
//! Emits exactly one `tracing` event per request that reaches this stage,
//! once its response is known. The request itself is never touched.

use chrono::{SecondsFormat, Utc};
use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::{Request, Response};

/// Access log middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        Stage::AccessLog.name()
    }

    fn on_request<'a>(
        &'a self,
        _ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move { Ok(Flow::Continue(request)) })
    }

    fn on_response(&self, ctx: &MiddlewareContext, response: &mut Response) {
        let duration_ms = ctx.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            request_id = %ctx.request_id(),
            http.method = %ctx.method(),
            http.path = %ctx.path(),
            http.status_code = response.status().as_u16(),
            duration_ms,
            timestamp = %Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "request completed"
        );
    }
}
