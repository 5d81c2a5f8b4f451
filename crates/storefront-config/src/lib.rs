//! # Storefront Config
//!
//! Typed configuration for the storefront server, read once at process start
//! from the environment (after an optional `.env` file).
//!
//! Required variables are validated before anything else runs; every missing
//! name is reported in a single [`ConfigError::MissingVariables`].
//!
//! ## Example
//!
//! ```
//! use storefront_config::{ConfigLoader, Environment, MapEnv};
//!
//! let source = MapEnv::new()
//!     .with("BACKEND_URL", "https://project.backend.example")
//!     .with("BACKEND_KEY", "anon-key")
//!     .with("SESSION_SECRET", "s3cret");
//!
//! let config = ConfigLoader::from_source(source).load().unwrap();
//! assert_eq!(config.port, 3000);
//! assert_eq!(config.environment, Environment::Development);
//! ```
//!
//! ## Variables
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `BACKEND_URL` | yes | |
//! | `BACKEND_KEY` | yes | |
//! | `SESSION_SECRET` | yes | |
//! | `PORT` | no | `3000` |
//! | `HOST` | no | `0.0.0.0` |
//! | `ENVIRONMENT_NAME` | no | `development` |
//! | `STATIC_DIR` | no | `public` |
//! | `LOG_LEVEL` | no | `debug` in development, `info` otherwise |
//! | `LOG_FORMAT` | no | `json` in production, `pretty` otherwise |

#![doc(html_root_url = "https://docs.rs/storefront-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod schema;
mod source;

pub use error::ConfigError;
pub use loader::{vars, ConfigLoader, DotenvStatus};
pub use schema::{Environment, LogFormat, StorefrontConfig};
pub use source::{EnvSource, MapEnv, ProcessEnv};
