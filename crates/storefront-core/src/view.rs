//! View rendering seam.
//!
//! Page handlers and the error normalizer both produce a view name plus a
//! JSON view-model; a [`ViewRenderer`] turns that pair into an HTML string.

use serde_json::Value;
use thiserror::Error;

/// Name of the view used for error pages.
pub const ERROR_VIEW: &str = "error";

/// Errors raised while rendering a view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No template is registered under this name.
    #[error("unknown view '{0}'")]
    UnknownView(String),

    /// The view-model lacks something the view needs.
    #[error("view '{view}' cannot render model: {reason}")]
    InvalidModel {
        /// The view being rendered.
        view: String,
        /// What was wrong.
        reason: String,
    },
}

/// Renders a named view with a JSON view-model.
pub trait ViewRenderer: Send + Sync + 'static {
    /// Produces the HTML document for `view`.
    fn render(&self, view: &str, model: &Value) -> Result<String, RenderError>;
}
