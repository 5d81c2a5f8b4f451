//! Ordered path router for the storefront.
//!
//! Routes are `(method, pattern, operation id)` entries checked in insertion
//! order; the first entry whose method and pattern both match wins.
//!
//! - Patterns are `/`-separated. A `{name}` segment captures exactly one
//!   path segment.
//! - Captured segments are percent-decoded; one that does not decode to
//!   UTF-8 is an [`InvalidParam`] error.
//! - Trailing slashes are ignored, except that `/` stays `/`.
//! - A `HEAD` request falls back to the `GET` route for the same path.
//!
//! # Example
//!
//! ```rust
//! use storefront_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.route(Method::GET, "/products", "listProducts");
//! router.route(Method::GET, "/products/{id}", "productDetail");
//!
//! let m = router.match_route(&Method::GET, "/products/summer%20dress/").unwrap().unwrap();
//! assert_eq!(m.operation_id, "productDetail");
//! assert_eq!(m.params.get("id"), Some("summer dress"));
//!
//! assert!(router.match_route(&Method::POST, "/products").unwrap().is_none());
//! assert!(router.match_route(&Method::GET, "/products/%FF").is_err());
//! ```

mod params;
mod pattern;
mod router;

pub use params::Params;
pub use pattern::{Pattern, Segment};
pub use router::{Route, Router};

/// A captured path segment that does not percent-decode to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path parameter '{name}' is not valid UTF-8: {raw}")]
pub struct InvalidParam {
    /// Parameter name from the pattern.
    pub name: String,
    /// The raw, still-encoded segment.
    pub raw: String,
}

/// A matched route with its operation ID and captured parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The operation ID for the matched route
    pub operation_id: &'a str,
    /// Captured path parameters
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(operation_id: &'a str, params: Params) -> Self {
        Self {
            operation_id,
            params,
        }
    }
}

/// Strips trailing slashes, keeping the root as `/`.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("/cart/"), "/cart");
        assert_eq!(normalize_path("/cart"), "/cart");
    }
}
