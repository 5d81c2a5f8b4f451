//! Middleware stages.
//!
//! One module per stage, in pipeline order, plus the error normalizer that
//! terminates every faulted request.

pub mod access_log;
pub mod backend;
pub mod body;
pub mod cookies;
pub mod cors;
pub mod error_normalization;
pub mod security_headers;
pub mod session;
pub mod static_assets;

pub use access_log::AccessLogMiddleware;
pub use backend::BackendInjectionMiddleware;
pub use body::{BodyParserMiddleware, ParsedBody};
pub use cookies::{CookieMiddleware, Cookies, SameSite, SetCookie};
pub use cors::{CorsConfig, CorsMiddleware};
pub use error_normalization::{is_api_request, ErrorNormalizer};
pub use security_headers::SecurityHeadersMiddleware;
pub use session::{CookieSigner, Session, SessionMiddleware, SessionStore, SESSION_COOKIE};
pub use static_assets::{StaticAssetsMiddleware, StaticFileError, StaticFiles};
