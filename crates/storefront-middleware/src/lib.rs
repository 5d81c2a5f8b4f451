//! # Storefront Middleware
//!
//! The fixed-order request pipeline every storefront request flows through.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → SecurityHeaders → Cors → AccessLog → Body → Cookies → Static
//!                                                                   ↓
//!                                        Endpoint ← Backend ← Session
//!
//! any fault ──→ ErrorNormalizer ──→ on_response (reverse) ──→ Responder
//! ```
//!
//! | Stage | Middleware          | Purpose                                     |
//! |-------|---------------------|---------------------------------------------|
//! | 1     | Security headers    | Hardening headers on every response         |
//! | 2     | CORS                | Permissive CORS, `OPTIONS` short-circuit    |
//! | 3     | Access log          | One structured event per request            |
//! | 4     | Body parsing        | JSON/form/raw body into the context         |
//! | 5     | Cookies             | `Cookie` header into the context            |
//! | 6     | Static assets       | Files under the static root                 |
//! | 7     | Session             | Signed-cookie sessions                      |
//! | 8     | Backend injection   | Shared backend client into the context      |
//! | 9     | Error normalization | Every fault becomes exactly one response    |
//!
//! ## Example
//!
//! ```
//! use storefront_middleware::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 9);
//! assert_eq!(stages[0].name(), "security_headers");
//! assert_eq!(stages[8].name(), "error_normalization");
//! ```

#![doc(html_root_url = "https://docs.rs/storefront-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod responder;
pub mod stages;
pub mod types;

pub use stages::session;

// Re-export main types at crate root
pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Endpoint, Flow, Middleware};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use responder::{Responder, ResponseReceiver};
pub use stages::ErrorNormalizer;
pub use types::{Request, Response, ResponseExt};
