//! Backend client injection.

use storefront_backend::BackendClient;
use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::types::Request;

/// Attaches the process-wide [`BackendClient`] to every request context.
#[derive(Debug, Clone)]
pub struct BackendInjectionMiddleware {
    client: BackendClient,
}

impl BackendInjectionMiddleware {
    /// Creates the stage around an already-validated client.
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

impl Middleware for BackendInjectionMiddleware {
    fn name(&self) -> &'static str {
        Stage::BackendInjection.name()
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move {
            ctx.set_backend(self.client.clone());
            Ok(Flow::Continue(request))
        })
    }
}
