//! # Storefront Server
//!
//! The outer layers of the storefront request lifecycle:
//!
//! - [`pages`] - Route table and page handlers producing view-models
//! - [`views`] - The default HTML [`ViewRenderer`](storefront_core::ViewRenderer)
//! - [`InvocationAdapter`] - Boundary shim with panic guard and last-resort response
//! - [`App`] - Assembles the fixed middleware pipeline from configuration
//! - [`Server`] - hyper HTTP/1.1 server with graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use storefront_server::{App, Server};
//!
//! let app = App::new(&config, backend);
//! Server::new(app.adapter().clone(), config.bind_addr()).run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/storefront-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;
pub mod invocation;
pub mod pages;
pub mod server;
pub mod shutdown;
pub mod views;

pub use app::App;
pub use error::ServerError;
pub use invocation::InvocationAdapter;
pub use pages::{Page, PageOutcome, PageRouter};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use views::HtmlRenderer;
