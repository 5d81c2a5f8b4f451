//! Core middleware trait and types.
//!
//! Every stage implements [`Middleware`]. A stage sees the request once on
//! the way in ([`Middleware::on_request`]) and the finished response once on
//! the way out ([`Middleware::on_response`]). Stages never call each other;
//! the [`Pipeline`](crate::Pipeline) drives them in order.
//!
//! # Example
//!
//! ```ignore
//! use storefront_middleware::{BoxFuture, Flow, Middleware, MiddlewareContext, Request, Response};
//! use storefront_core::ErrorRecord;
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered_by"
//!     }
//!
//!     fn on_request<'a>(
//!         &'a self,
//!         _ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!     ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
//!         Box::pin(async move { Ok(Flow::Continue(request)) })
//!     }
//!
//!     fn on_response(&self, _ctx: &MiddlewareContext, response: &mut Response) {
//!         response.headers_mut().insert("x-powered-by", "storefront".parse().unwrap());
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use storefront_core::ErrorRecord;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a stage decided to do with a request.
#[derive(Debug)]
pub enum Flow {
    /// Pass the (possibly modified) request to the next stage.
    Continue(Request),
    /// Stop here and answer with this response.
    Respond(Response),
}

/// A pipeline stage.
///
/// Faults are returned as `Err(ErrorRecord)` and go straight to the error
/// normalizer; a stage never builds its own error response.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects or transforms the incoming request.
    fn on_request<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>>;

    /// Adjusts the outgoing response.
    ///
    /// Runs in reverse stage order for every stage whose `on_request` was
    /// entered, whatever produced the response.
    fn on_response(&self, _ctx: &MiddlewareContext, _response: &mut Response) {}
}

/// The terminal handler the pipeline dispatches to after the last stage.
pub trait Endpoint: Send + Sync + 'static {
    /// Produces the response for a request that passed every stage.
    fn call<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Response, ErrorRecord>>;
}
