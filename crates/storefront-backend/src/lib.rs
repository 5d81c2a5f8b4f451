//! # Storefront Backend
//!
//! The shared client handle for the external data/auth service.
//!
//! One [`BackendClient`] is built at startup from validated configuration and
//! cloned into every request (it is an `Arc` inside). Construction fails fast
//! on an unusable URL or key, so the server never runs with a half-built
//! client.
//!
//! The service speaks a REST dialect where tables live under
//! `{url}/rest/v1/{table}` and every call carries the `apikey` and
//! `Authorization: Bearer` headers.

#![doc(html_root_url = "https://docs.rs/storefront-backend/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;

pub use client::{BackendClient, Filter, CONNECTION_CHECK_TABLE};
pub use error::BackendError;
