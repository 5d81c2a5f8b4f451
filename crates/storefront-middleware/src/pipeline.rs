//! Fixed-order middleware pipeline.
//!
//! ## Pipeline Stages
//!
//! 1. **Security headers** - Hardening response headers
//! 2. **CORS** - Permissive CORS headers, `OPTIONS` short-circuit
//! 3. **Access log** - One structured event per request
//! 4. **Body parsing** - JSON, form, or raw body into the context
//! 5. **Cookies** - `Cookie` header into the context
//! 6. **Static assets** - Serve files under the static root
//! 7. **Session** - Signed-cookie session attachment
//! 8. **Backend injection** - Shared backend client into the context
//! 9. **Error normalization** - Every fault becomes one response
//!
//! Requests walk the stages in order until one responds or faults, then the
//! endpoint runs. Whatever the outcome, the response walks back through the
//! `on_response` hook of every stage that was entered, in reverse order, and
//! is delivered through the context's [`Responder`](crate::Responder).

use std::sync::Arc;

use storefront_core::ErrorRecord;

use crate::context::MiddlewareContext;
use crate::middleware::{Endpoint, Flow, Middleware};
use crate::responder::Responder;
use crate::stages::error_normalization::ErrorNormalizer;
use crate::types::{Request, Response};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The middleware pipeline plus its endpoint.
///
/// # Example
///
/// ```ignore
/// use storefront_middleware::{Pipeline, stages::CorsMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .add_stage(CorsMiddleware::default())
///     .endpoint(router)
///     .build();
///
/// let response = pipeline.handle(request).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
    normalizer: ErrorNormalizer,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs `request` through every stage and the endpoint, then delivers
    /// the response through `ctx`'s responder.
    ///
    /// Faults from any stage or the endpoint go to the error normalizer. If
    /// the request was already answered the normalizer yields nothing and
    /// no second response is sent.
    pub async fn process(&self, ctx: &mut MiddlewareContext, request: Request) {
        ctx.record_request(&request);

        let (entered, outcome) = self.run_stages(ctx, request).await;

        let response = match outcome {
            Ok(response) => Some(response),
            Err(record) => self.normalizer.normalize(ctx, record),
        };

        let Some(mut response) = response else {
            return;
        };

        for stage in self.stages[..entered].iter().rev() {
            stage.on_response(ctx, &mut response);
        }

        if let Err(e) = ctx.responder().send(response) {
            tracing::warn!(
                request_id = %ctx.request_id(),
                error = %e,
                "dropping second response for request"
            );
        }
    }

    async fn run_stages(
        &self,
        ctx: &mut MiddlewareContext,
        mut request: Request,
    ) -> (usize, Result<Response, ErrorRecord>) {
        for (index, stage) in self.stages.iter().enumerate() {
            match stage.on_request(ctx, request).await {
                Ok(Flow::Continue(next)) => request = next,
                Ok(Flow::Respond(response)) => {
                    tracing::trace!(stage = stage.name(), "stage responded");
                    return (index + 1, Ok(response));
                }
                Err(record) => {
                    tracing::trace!(stage = stage.name(), "stage faulted");
                    return (index + 1, Err(record));
                }
            }
        }

        let outcome = self.endpoint.call(ctx, request).await;
        (self.stages.len(), outcome)
    }

    /// Processes `request` with a fresh context and returns its response.
    ///
    /// `None` only if nothing was delivered, which the pipeline never does
    /// on its own.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let (responder, mut receiver) = Responder::channel();
        let mut ctx = MiddlewareContext::with_responder(responder);
        self.process(&mut ctx, request).await;
        receiver.try_recv()
    }

    /// The error normalizer.
    #[must_use]
    pub const fn normalizer(&self) -> &ErrorNormalizer {
        &self.normalizer
    }

    /// Names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
    endpoint: Option<Arc<dyn Endpoint>>,
    normalizer: ErrorNormalizer,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn endpoint<E: Endpoint>(mut self, endpoint: E) -> Self {
        self.endpoint = Some(Arc::new(endpoint));
        self
    }

    /// Sets the error normalizer.
    #[must_use]
    pub fn normalizer(mut self, normalizer: ErrorNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Builds the pipeline.
    ///
    /// Without an endpoint every request that passes the stages is a 404.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            endpoint: self.endpoint.unwrap_or_else(|| Arc::new(NotFoundEndpoint)),
            normalizer: self.normalizer,
        }
    }
}

struct NotFoundEndpoint;

impl Endpoint for NotFoundEndpoint {
    fn call<'a>(
        &'a self,
        _ctx: &'a mut MiddlewareContext,
        _request: Request,
    ) -> crate::middleware::BoxFuture<'a, Result<Response, ErrorRecord>> {
        Box::pin(async { Err(ErrorRecord::not_found()) })
    }
}

/// Middleware stage marker, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Security headers
    SecurityHeaders = 1,
    /// Stage 2: CORS
    Cors = 2,
    /// Stage 3: Access logging
    AccessLog = 3,
    /// Stage 4: Body parsing
    BodyParsing = 4,
    /// Stage 5: Cookie parsing
    Cookies = 5,
    /// Stage 6: Static assets
    StaticAssets = 6,
    /// Stage 7: Session attachment
    Session = 7,
    /// Stage 8: Backend client injection
    BackendInjection = 8,
    /// Stage 9: Error normalization
    ErrorNormalization = 9,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SecurityHeaders => "security_headers",
            Self::Cors => "cors",
            Self::AccessLog => "access_log",
            Self::BodyParsing => "body_parsing",
            Self::Cookies => "cookies",
            Self::StaticAssets => "static_assets",
            Self::Session => "session",
            Self::BackendInjection => "backend_injection",
            Self::ErrorNormalization => "error_normalization",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Self; 9] {
        [
            Self::SecurityHeaders,
            Self::Cors,
            Self::AccessLog,
            Self::BodyParsing,
            Self::Cookies,
            Self::StaticAssets,
            Self::Session,
            Self::BackendInjection,
            Self::ErrorNormalization,
        ]
    }
}
