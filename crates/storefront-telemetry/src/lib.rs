//! Structured logging for the storefront.
//!
//! All runtime events go through `tracing`. This crate owns the subscriber
//! setup: JSON output in production, pretty output in development, with the
//! level taken from `LOG_LEVEL` through an `EnvFilter`.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from(&config))?;
//! tracing::info!(port = config.port, "storefront starting");
//! ```

#![doc(html_root_url = "https://docs.rs/storefront-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
