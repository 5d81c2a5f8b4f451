//! Per-request context.
//!
//! The [`MiddlewareContext`] is created when a request enters the pipeline
//! and discarded once its response is delivered. Stages enrich it in order:
//! parsed body, cookies, session, backend client. The endpoint then reads
//! those through typed accessors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use http::{HeaderMap, Method};
use storefront_backend::BackendClient;
use storefront_core::{RequestId, ResponseState, SessionUser};
use storefront_router::Params;

use crate::responder::Responder;
use crate::stages::body::ParsedBody;
use crate::stages::cookies::Cookies;
use crate::stages::session::Session;
use crate::types::Request;

/// Context that flows through the pipeline.
///
/// # Example
///
/// ```
/// use storefront_middleware::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_extension(42_u32);
/// assert_eq!(ctx.get_extension::<u32>(), Some(&42));
/// assert!(ctx.user().is_none());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    method: Method,
    path: String,
    headers: HeaderMap,
    responder: Responder,
    started_at: Instant,
    body: ParsedBody,
    cookies: Cookies,
    session: Option<Session>,
    backend: Option<BackendClient>,
    params: Params,
    operation_id: Option<String>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MiddlewareContext {
    /// Creates a context with a detached responder.
    #[must_use]
    pub fn new() -> Self {
        Self::with_responder(Responder::detached())
    }

    /// Creates a context that delivers through `responder`.
    #[must_use]
    pub fn with_responder(responder: Responder) -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
            responder,
            started_at: Instant::now(),
            body: ParsedBody::Empty,
            cookies: Cookies::new(),
            session: None,
            backend: None,
            params: Params::new(),
            operation_id: None,
            extensions: HashMap::new(),
        }
    }

    /// Records the request line and headers for later stages.
    ///
    /// The pipeline calls this on entry so that the error normalizer and the
    /// access log still know what was asked after the request is consumed.
    pub fn record_request(&mut self, request: &Request) {
        self.method = request.method().clone();
        self.path = request.uri().path().to_string();
        self.headers = request.headers().clone();
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers as received.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request's responder.
    #[must_use]
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// The request's sent flag.
    #[must_use]
    pub fn response_state(&self) -> &ResponseState {
        self.responder.state()
    }

    /// When the request entered the pipeline.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The decoded body.
    #[must_use]
    pub fn body(&self) -> &ParsedBody {
        &self.body
    }

    /// Stores the decoded body.
    pub fn set_body(&mut self, body: ParsedBody) {
        self.body = body;
    }

    /// Parsed request cookies.
    #[must_use]
    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// Stores parsed cookies.
    pub fn set_cookies(&mut self, cookies: Cookies) {
        self.cookies = cookies;
    }

    /// The attached session, if the session stage ran.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable access to the attached session.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Attaches a session.
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().and_then(Session::user)
    }

    /// The injected backend client.
    #[must_use]
    pub fn backend(&self) -> Option<&BackendClient> {
        self.backend.as_ref()
    }

    /// Injects the backend client.
    pub fn set_backend(&mut self, backend: BackendClient) {
        self.backend = Some(backend);
    }

    /// Route parameters captured by the router.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Stores route parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// The matched operation, once routed.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Records the matched operation.
    pub fn set_operation_id(&mut self, operation_id: impl Into<String>) {
        self.operation_id = Some(operation_id.into());
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok())
            .map(|b| *b)
    }
}
