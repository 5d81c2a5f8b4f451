//! Application assembly.
//!
//! Wires the configured stages, the page router and the error normalizer
//! into one [`InvocationAdapter`].

use std::sync::Arc;

use storefront_backend::BackendClient;
use storefront_config::StorefrontConfig;
use storefront_core::ViewRenderer;
use storefront_middleware::stages::{
    AccessLogMiddleware, BackendInjectionMiddleware, BodyParserMiddleware, CookieMiddleware,
    CorsConfig, CorsMiddleware, ErrorNormalizer, SecurityHeadersMiddleware, SessionMiddleware,
    SessionStore, StaticAssetsMiddleware,
};
use storefront_middleware::Pipeline;

use crate::invocation::InvocationAdapter;
use crate::pages::PageRouter;
use crate::views::HtmlRenderer;

/// The assembled storefront.
#[derive(Debug, Clone)]
pub struct App {
    adapter: Arc<InvocationAdapter>,
    sessions: SessionStore,
}

impl App {
    /// Builds the app with the built-in HTML views.
    #[must_use]
    pub fn new(config: &StorefrontConfig, backend: BackendClient) -> Self {
        Self::with_renderer(config, backend, Arc::new(HtmlRenderer::new()))
    }

    /// Builds the app with a custom renderer.
    #[must_use]
    pub fn with_renderer(
        config: &StorefrontConfig,
        backend: BackendClient,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Self {
        let sessions = SessionStore::new();
        let production = config.is_production();
        let cors = CorsConfig::permissive();
        let security = SecurityHeadersMiddleware::new();

        let pipeline = Pipeline::builder()
            .add_stage(security.clone())
            .add_stage(CorsMiddleware::new(cors.clone()))
            .add_stage(AccessLogMiddleware::new())
            .add_stage(BodyParserMiddleware::new())
            .add_stage(CookieMiddleware::new())
            .add_stage(StaticAssetsMiddleware::new(&config.static_dir))
            .add_stage(
                SessionMiddleware::new(&config.session_secret)
                    .with_store(sessions.clone())
                    .secure(production),
            )
            .add_stage(BackendInjectionMiddleware::new(backend))
            .normalizer(
                ErrorNormalizer::new()
                    .with_renderer(Arc::clone(&renderer))
                    .expose_details(!production),
            )
            .endpoint(PageRouter::new(renderer))
            .build();

        tracing::debug!(stages = ?pipeline.stage_names(), "pipeline assembled");

        let adapter = InvocationAdapter::new(pipeline)
            .cors(cors)
            .security_headers(security)
            .expose_details(!production);

        Self {
            adapter: Arc::new(adapter),
            sessions,
        }
    }

    /// The request entry point.
    #[must_use]
    pub const fn adapter(&self) -> &Arc<InvocationAdapter> {
        &self.adapter
    }

    /// The shared session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
