//! The ordered router.

use http::Method;

use crate::pattern::Pattern;
use crate::{InvalidParam, RouteMatch};

/// One routing entry.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: Pattern,
    operation_id: String,
}

impl Route {
    /// The HTTP method this route answers.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The path pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The operation ID.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }
}

/// First-match-wins router over an ordered route list.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Earlier routes take precedence.
    pub fn route(&mut self, method: Method, pattern: &str, operation_id: impl Into<String>) {
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(pattern),
            operation_id: operation_id.into(),
        });
    }

    /// Builder-style [`route`](Self::route).
    #[must_use]
    pub fn with_route(mut self, method: Method, pattern: &str, operation_id: impl Into<String>) -> Self {
        self.route(method, pattern, operation_id);
        self
    }

    /// Finds the first route matching `method` and `path`.
    ///
    /// `HEAD` is tried as itself first, then as `GET`.
    ///
    /// # Errors
    ///
    /// [`InvalidParam`] when the first matching route captures a segment
    /// that does not decode.
    pub fn match_route(&self, method: &Method, path: &str) -> Result<Option<RouteMatch<'_>>, InvalidParam> {
        if let Some(matched) = self.find(method, path)? {
            return Ok(Some(matched));
        }
        if method == Method::HEAD {
            return self.find(&Method::GET, path);
        }
        Ok(None)
    }

    /// Registered routes in precedence order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn find(&self, method: &Method, path: &str) -> Result<Option<RouteMatch<'_>>, InvalidParam> {
        for route in self.routes.iter().filter(|r| r.method == *method) {
            if let Some(params) = route.pattern.matches(path)? {
                return Ok(Some(RouteMatch::new(&route.operation_id, params)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storefront_routes() -> Router {
        Router::new()
            .with_route(Method::GET, "/", "home")
            .with_route(Method::GET, "/products", "listProducts")
            .with_route(Method::GET, "/products/{id}", "productDetail")
            .with_route(Method::GET, "/cart", "cart")
    }

    #[test]
    fn test_basic_matching() {
        let router = storefront_routes();
        assert_eq!(router.len(), 4);

        let m = router.match_route(&Method::GET, "/").unwrap().unwrap();
        assert_eq!(m.operation_id, "home");
        assert!(m.params.is_empty());

        let m = router.match_route(&Method::GET, "/products/abc").unwrap().unwrap();
        assert_eq!(m.operation_id, "productDetail");
        assert_eq!(m.params.get("id"), Some("abc"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let router = storefront_routes();
        assert_eq!(
            router.match_route(&Method::GET, "/cart/").unwrap().unwrap().operation_id,
            "cart"
        );
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new()
            .with_route(Method::GET, "/products/{id}", "productDetail")
            .with_route(Method::GET, "/products/featured", "featured");

        let m = router.match_route(&Method::GET, "/products/featured").unwrap().unwrap();
        assert_eq!(m.operation_id, "productDetail");
        assert_eq!(m.params.get("id"), Some("featured"));
    }

    #[test]
    fn test_method_mismatch_is_no_match() {
        let router = storefront_routes();
        assert!(router.match_route(&Method::POST, "/cart").unwrap().is_none());
        assert!(router.match_route(&Method::DELETE, "/").unwrap().is_none());
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let router = storefront_routes();
        let m = router.match_route(&Method::HEAD, "/products").unwrap().unwrap();
        assert_eq!(m.operation_id, "listProducts");
    }

    #[test]
    fn test_unknown_path() {
        let router = storefront_routes();
        assert!(router.match_route(&Method::GET, "/nope").unwrap().is_none());
    }

    #[test]
    fn test_undecodable_param_is_an_error() {
        let router = storefront_routes();
        let err = router.match_route(&Method::GET, "/products/%C3%28").unwrap_err();
        assert_eq!(err.name, "id");
        assert!(router.match_route(&Method::POST, "/products/%C3%28").unwrap().is_none());
    }
}
