//! # Storefront
//!
//! A server-rendered fashion storefront. Every HTTP request runs through one
//! lifecycle:
//!
//! ```text
//! Request → SecurityHeaders → CORS → AccessLog → BodyParser → Cookies
//!         → StaticAssets → Session → Backend → PageRouter
//!                                                  ↓
//! Response ← on_response (reverse) ← ErrorNormalizer ←┘
//! ```
//!
//! This crate owns process startup and re-exports the component crates.
//!
//! ## Startup
//!
//! 1. Load `.env` and validate the environment (fatal on any missing key)
//! 2. Install the `tracing` subscriber
//! 3. Build the shared backend client (fatal on a bad URL or key)
//! 4. Check backend connectivity once (logged, never fatal)
//! 5. Assemble the pipeline and serve until SIGINT/SIGTERM
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     storefront::run().await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/storefront/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::time::Duration;

use anyhow::Context;

pub use storefront_backend as backend;
pub use storefront_config as config;
pub use storefront_core as core;
pub use storefront_middleware as middleware;
pub use storefront_router as router;
pub use storefront_server as server;
pub use storefront_telemetry as telemetry;

use storefront_backend::{BackendClient, CONNECTION_CHECK_TABLE};
use storefront_config::{ConfigLoader, StorefrontConfig};
use storefront_server::{App, Server, ShutdownSignal};
use storefront_telemetry::{init_logging, LogConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often expired sessions are evicted.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Full startup: config, logging, then [`serve`] until an OS signal.
pub async fn run() -> anyhow::Result<()> {
    let loader = ConfigLoader::new().with_dotenv();
    let config = loader.load().context("invalid configuration")?;

    init_logging(&LogConfig::from(&config)).context("failed to initialize logging")?;
    if let Some(status) = loader.dotenv_status() {
        status.log();
    }

    let result = serve(config, ShutdownSignal::with_os_signals()).await;
    if let Err(e) = &result {
        tracing::error!(error = format!("{e:#}"), "storefront exited with error");
    }
    result
}

/// Builds the backend client and pipeline from `config` and serves until
/// `shutdown` triggers.
///
/// Logging must already be initialized.
pub async fn serve(config: StorefrontConfig, shutdown: ShutdownSignal) -> anyhow::Result<()> {
    tracing::info!(
        version = VERSION,
        environment = %config.environment,
        "storefront starting"
    );
    for (key, value) in config.redacted_summary() {
        tracing::info!(key, value = %value, "configuration");
    }

    let backend = BackendClient::from_config(&config).context("failed to create backend client")?;
    backend.check_connection(CONNECTION_CHECK_TABLE).await;

    let app = App::new(&config, backend);
    let sweeper = app.sessions().spawn_sweeper(SESSION_SWEEP_INTERVAL);

    let result = Server::new(app.adapter().clone(), config.bind_addr())
        .run_with_shutdown(shutdown)
        .await
        .context("server failed");

    sweeper.abort();
    result
}
