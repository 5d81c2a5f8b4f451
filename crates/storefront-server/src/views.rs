//! Built-in HTML views.
//!
//! [`HtmlRenderer`] renders every page view plus the error view into a small
//! HTML document: shared layout, navigation that depends on whether a user
//! is signed in, and a per-view body. Every interpolated string is escaped.

use serde_json::Value;
use storefront_core::{RenderError, ViewRenderer, ERROR_VIEW};

/// Escapes text for HTML element and attribute content.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// The default renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Creates the renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn body(view: &str, model: &Value) -> Result<String, RenderError> {
        let title = escape_html(required_str(view, model, "title")?);

        let body = match view {
            "index" => format!(
                "<h1>{title}</h1>\n<p>New season styles, delivered.</p>\n\
                 <p><a href=\"/products\">Shop all products</a></p>"
            ),
            "products" => format!(
                "<h1>{title}</h1>\n<section class=\"product-grid\" data-source=\"/products\"></section>"
            ),
            "product-detail" => {
                let id = escape_html(required_str(view, model, "productId")?);
                format!(
                    "<h1>{title}</h1>\n<article class=\"product\" data-product-id=\"{id}\">\
                     <p>Product {id}</p></article>"
                )
            }
            "cart" => format!(
                "<h1>{title}</h1>\n<section class=\"cart\"></section>\n\
                 <p><a href=\"/checkout\">Proceed to checkout</a></p>"
            ),
            "checkout" => {
                let who = model
                    .get("user")
                    .and_then(user_label)
                    .map(|label| escape_html(&label))
                    .ok_or_else(|| RenderError::InvalidModel {
                        view: view.to_string(),
                        reason: "checkout requires a signed-in user".to_string(),
                    })?;
                format!("<h1>{title}</h1>\n<p>Checking out as {who}.</p>")
            }
            "login" => format!(
                "<h1>{title}</h1>\n{}\n\
                 <p><a href=\"/register\">Create an account</a></p>",
                credentials_form("Sign in")
            ),
            "register" => format!(
                "<h1>{title}</h1>\n{}",
                credentials_form("Create account")
            ),
            ERROR_VIEW => {
                let message = escape_html(required_str(view, model, "message")?);
                let status = model.get("status").and_then(Value::as_u64).unwrap_or(500);
                let stack = model
                    .get("stack")
                    .and_then(Value::as_str)
                    .map(|s| format!("\n<pre>{}</pre>", escape_html(s)))
                    .unwrap_or_default();
                format!("<h1>{status} {title}</h1>\n<p>{message}</p>{stack}")
            }
            other => return Err(RenderError::UnknownView(other.to_string())),
        };

        Ok(body)
    }
}

impl ViewRenderer for HtmlRenderer {
    fn render(&self, view: &str, model: &Value) -> Result<String, RenderError> {
        let body = Self::body(view, model)?;
        let title = escape_html(required_str(view, model, "title")?);
        let nav = nav(model.get("user").and_then(user_label).as_deref());

        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<link rel=\"stylesheet\" href=\"/css/site.css\">\n</head>\n\
             <body>\n{nav}\n<main>\n{body}\n</main>\n</body>\n</html>\n"
        ))
    }
}

fn required_str<'m>(view: &str, model: &'m Value, key: &str) -> Result<&'m str, RenderError> {
    model
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RenderError::InvalidModel {
            view: view.to_string(),
            reason: format!("missing string field '{key}'"),
        })
}

fn user_label(user: &Value) -> Option<String> {
    user.get("email")
        .and_then(Value::as_str)
        .or_else(|| user.get("id").and_then(Value::as_str))
        .map(str::to_string)
}

// No route accepts credentials, so the form is rendered disabled and never submits.
fn credentials_form(submit: &str) -> String {
    format!(
        "<form class=\"credentials\"><fieldset disabled>\
         <input type=\"email\" name=\"email\"><input type=\"password\" name=\"password\">\
         <button type=\"submit\">{submit}</button></fieldset></form>"
    )
}

fn nav(user: Option<&str>) -> String {
    let account = match user {
        Some(label) => format!("<span class=\"account\">{}</span>", escape_html(label)),
        None => "<a href=\"/login\">Login</a> <a href=\"/register\">Register</a>".to_string(),
    };
    format!(
        "<nav><a href=\"/\">Home</a> <a href=\"/products\">Products</a> \
         <a href=\"/cart\">Cart</a> {account}</nav>"
    )
}
