//! Page routes and handlers.
//!
//! | Method | Path             | Operation       | View             |
//! |--------|------------------|-----------------|------------------|
//! | GET    | `/`              | `home`          | `index`          |
//! | GET    | `/products`      | `listProducts`  | `products`       |
//! | GET    | `/products/{id}` | `productDetail` | `product-detail` |
//! | GET    | `/cart`          | `cart`          | `cart`           |
//! | GET    | `/checkout`      | `checkout`      | `checkout`       |
//! | GET    | `/login`         | `login`         | `login`          |
//! | GET    | `/register`      | `register`      | `register`       |
//!
//! Handlers never touch the response directly. Each returns a
//! [`PageOutcome`] that [`PageRouter`] turns into HTML or a redirect.

use std::sync::Arc;

use anyhow::Context;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use storefront_core::{ErrorRecord, SessionUser, ViewRenderer};
use storefront_middleware::{BoxFuture, Endpoint, MiddlewareContext, Request, Response, ResponseExt};
use storefront_router::{Params, Router};

/// One storefront page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Landing page.
    Home,
    /// Product listing.
    ListProducts,
    /// Single product.
    ProductDetail,
    /// Shopping cart.
    Cart,
    /// Checkout, signed-in users only.
    Checkout,
    /// Sign-in form.
    Login,
    /// Sign-up form.
    Register,
}

impl Page {
    /// Every page, in routing order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Home,
            Self::ListProducts,
            Self::ProductDetail,
            Self::Cart,
            Self::Checkout,
            Self::Login,
            Self::Register,
        ]
    }

    /// Route operation id.
    #[must_use]
    pub const fn operation_id(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::ListProducts => "listProducts",
            Self::ProductDetail => "productDetail",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
            Self::Login => "login",
            Self::Register => "register",
        }
    }

    /// Route pattern.
    #[must_use]
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::ListProducts => "/products",
            Self::ProductDetail => "/products/{id}",
            Self::Cart => "/cart",
            Self::Checkout => "/checkout",
            Self::Login => "/login",
            Self::Register => "/register",
        }
    }

    /// View rendered on success.
    #[must_use]
    pub const fn view(self) -> &'static str {
        match self {
            Self::Home => "index",
            Self::ListProducts => "products",
            Self::ProductDetail => "product-detail",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
            Self::Login => "login",
            Self::Register => "register",
        }
    }

    /// Page title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "Fashion Store",
            Self::ListProducts => "All Products",
            Self::ProductDetail => "Product Details",
            Self::Cart => "Shopping Cart",
            Self::Checkout => "Checkout",
            Self::Login => "Login",
            Self::Register => "Register",
        }
    }

    /// Looks a page up by operation id.
    #[must_use]
    pub fn from_operation_id(operation_id: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|page| page.operation_id() == operation_id)
    }
}

/// What a page handler decided.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Render `view` with `model`.
    Render {
        /// View name.
        view: &'static str,
        /// View-model.
        model: Value,
    },
    /// `302` to `location`.
    Redirect {
        /// Target path.
        location: &'static str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageModel<'a> {
    title: &'static str,
    user: Option<&'a SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<&'a str>,
}

/// Runs the handler for `page`.
pub fn handle_page(
    page: Page,
    user: Option<&SessionUser>,
    params: &Params,
) -> Result<PageOutcome, ErrorRecord> {
    match (page, user) {
        (Page::Checkout, None) => {
            return Ok(PageOutcome::Redirect { location: "/login" });
        }
        (Page::Login | Page::Register, Some(_)) => {
            return Ok(PageOutcome::Redirect { location: "/" });
        }
        _ => {}
    }

    let product_id = match page {
        Page::ProductDetail => Some(
            params
                .get("id")
                .ok_or_else(|| ErrorRecord::internal("productDetail matched without an id"))?,
        ),
        _ => None,
    };

    let model = PageModel {
        title: page.title(),
        user,
        product_id,
    };
    let model = serde_json::to_value(&model)
        .context("Failed to build view-model")
        .map_err(|e| ErrorRecord::from_error(&e))?;

    Ok(PageOutcome::Render {
        view: page.view(),
        model,
    })
}

/// Builds the page router.
#[must_use]
pub fn page_routes() -> Router {
    Page::all().into_iter().fold(Router::new(), |router, page| {
        router.with_route(Method::GET, page.pattern(), page.operation_id())
    })
}

/// The pipeline endpoint: routes a request to its page and renders it.
///
/// Unmatched requests become a not-found fault for the error normalizer.
#[derive(Clone)]
pub struct PageRouter {
    router: Router,
    renderer: Arc<dyn ViewRenderer>,
}

impl std::fmt::Debug for PageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRouter")
            .field("routes", &self.router.len())
            .finish_non_exhaustive()
    }
}

impl PageRouter {
    /// The standard pages, rendered by `renderer`.
    #[must_use]
    pub fn new(renderer: Arc<dyn ViewRenderer>) -> Self {
        Self {
            router: page_routes(),
            renderer,
        }
    }

    /// The underlying route table.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    fn dispatch(&self, ctx: &mut MiddlewareContext, request: &Request) -> Result<Response, ErrorRecord> {
        let matched = self
            .router
            .match_route(request.method(), request.uri().path())
            .map_err(|e| ErrorRecord::bad_request(e.to_string()))?;
        let Some(matched) = matched else {
            return Err(ErrorRecord::not_found());
        };
        let page = Page::from_operation_id(matched.operation_id).ok_or_else(ErrorRecord::not_found)?;

        ctx.set_operation_id(page.operation_id());
        ctx.set_params(matched.params);

        tracing::debug!(
            request_id = %ctx.request_id(),
            operation_id = page.operation_id(),
            "dispatching page"
        );

        match handle_page(page, ctx.user(), ctx.params())? {
            PageOutcome::Render { view, model } => {
                let html = self
                    .renderer
                    .render(view, &model)
                    .with_context(|| format!("Failed to render view '{view}'"))
                    .map_err(|e| ErrorRecord::from_error(&e))?;
                Ok(Response::html(http::StatusCode::OK, html))
            }
            PageOutcome::Redirect { location } => Ok(Response::redirect(location)),
        }
    }
}

impl Endpoint for PageRouter {
    fn call<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Response, ErrorRecord>> {
        Box::pin(async move { self.dispatch(ctx, &request) })
    }
}
