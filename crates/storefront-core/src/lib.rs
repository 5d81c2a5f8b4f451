//! # Storefront Core
//!
//! Core types shared by every stage of the storefront request lifecycle.
//!
//! - [`ErrorRecord`] - Normalized representation of any per-request fault
//! - [`ErrorKind`] - Classification of faults (not found, bad request, internal)
//! - [`RequestId`] - UUID v7 request identifier
//! - [`SessionUser`] - Authenticated user attached to a session
//! - [`ResponseState`] - One-shot guard that enforces a single response per request
//! - [`ViewRenderer`] - Seam between view-models and HTML output

#![doc(html_root_url = "https://docs.rs/storefront-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod identity;
mod request_id;
mod response;
mod view;

pub use error::{ErrorKind, ErrorRecord};
pub use identity::SessionUser;
pub use request_id::RequestId;
pub use response::{ResponseError, ResponseState};
pub use view::{RenderError, ViewRenderer, ERROR_VIEW};
