//! Cookie-correlated server-side sessions.
//!
//! The session cookie carries `<uuid>.<signature>`, where the signature is
//! the base64url HMAC-SHA256 of the id under the session secret. A cookie whose
//! signature does not verify is ignored and a fresh session is issued.
//!
//! Sessions are saved on first sight even when nothing was stored in them,
//! and each request pushes the expiry out by the configured TTL and re-issues
//! the cookie.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use http::{header, HeaderValue};
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use storefront_core::{ErrorRecord, SessionUser};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};
use crate::pipeline::Stage;
use crate::stages::cookies::{SameSite, SetCookie};
use crate::types::{Request, Response};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "storefront.sid";

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)))
}

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: Uuid,
    user: Option<SessionUser>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// A new anonymous session expiring after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user: None,
            created_at: now,
            expires_at: now + to_chrono(ttl),
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Signs a user in or out.
    pub fn set_user(&mut self, user: Option<SessionUser>) {
        self.user = user;
    }

    /// True when a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expiry time.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if the session had expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Pushes the expiry out to `ttl` from now.
    pub fn refresh(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + to_chrono(ttl);
    }
}

/// In-memory session store shared by every request.
///
/// Concurrent requests for the same session are not coordinated; the last
/// save wins.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl SessionStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a live session. Expired entries are removed.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Session> {
        let session = self.sessions.get(id).map(|entry| entry.value().clone())?;
        if session.is_expired() {
            self.sessions.remove(id);
            return None;
        }
        Some(session)
    }

    /// Inserts or replaces a session.
    pub fn save(&self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    /// Deletes a session.
    pub fn remove(&self, id: &Uuid) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Drops every expired session and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before.saturating_sub(self.sessions.len())
    }

    /// Runs [`sweep`](Self::sweep) every `period` until the task is aborted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired sessions");
                }
            }
        })
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").field("secret", &"***").finish()
    }
}

impl CookieSigner {
    /// A signer keyed by `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret.as_ref())
                .expect("HMAC accepts keys of any length"),
        }
    }

    fn keyed(&self, id: &Uuid) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac
    }

    /// The cookie value for `id`.
    #[must_use]
    pub fn sign(&self, id: &Uuid) -> String {
        let tag = self.keyed(id).finalize().into_bytes();
        format!("{id}.{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// The id carried by `value`, if its signature verifies.
    #[must_use]
    pub fn verify(&self, value: &str) -> Option<Uuid> {
        let (id, signature) = value.rsplit_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(signature).ok()?;
        self.keyed(&id).verify_slice(&tag).ok().map(|()| id)
    }
}

/// Session attachment middleware.
///
/// Reads the cookie jar left by the cookie stage, so it must run after it.
#[derive(Debug, Clone)]
pub struct SessionMiddleware {
    store: SessionStore,
    signer: CookieSigner,
    ttl: Duration,
    secure: bool,
}

impl SessionMiddleware {
    /// Creates the stage with a fresh store and the default TTL.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            store: SessionStore::new(),
            signer: CookieSigner::new(secret),
            ttl: DEFAULT_SESSION_TTL,
            secure: false,
        }
    }

    /// Shares an existing store.
    #[must_use]
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = store;
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Marks the cookie `Secure`. Enabled in production only.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The cookie signer.
    #[must_use]
    pub const fn signer(&self) -> &CookieSigner {
        &self.signer
    }

    fn resolve(&self, ctx: &MiddlewareContext) -> Session {
        let Some(raw) = ctx.cookies().get(SESSION_COOKIE) else {
            return Session::new(self.ttl);
        };

        match self.signer.verify(raw) {
            Some(id) => self.store.get(&id).unwrap_or_else(|| {
                tracing::debug!(request_id = %ctx.request_id(), "session expired or unknown, issuing new one");
                Session::new(self.ttl)
            }),
            None => {
                tracing::warn!(request_id = %ctx.request_id(), "rejected session cookie with bad signature");
                Session::new(self.ttl)
            }
        }
    }

    fn cookie(&self, session: &Session) -> SetCookie {
        SetCookie::new(SESSION_COOKIE, self.signer.sign(&session.id()))
            .path("/")
            .max_age(self.ttl)
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        Stage::Session.name()
    }

    fn on_request<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Flow, ErrorRecord>> {
        Box::pin(async move {
            let mut session = self.resolve(ctx);
            session.refresh(self.ttl);
            self.store.save(session.clone());
            ctx.set_session(session);
            Ok(Flow::Continue(request))
        })
    }

    fn on_response(&self, ctx: &MiddlewareContext, response: &mut Response) {
        let Some(session) = ctx.session() else {
            return;
        };

        // handlers may have changed the user
        self.store.save(session.clone());

        match HeaderValue::from_str(&self.cookie(session).to_header_value()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "failed to encode session cookie");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::cookies::Cookies;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    const SECRET: &str = "test-secret";

    fn request() -> Request {
        http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ctx_with_cookie(value: Option<&str>) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        if let Some(value) = value {
            ctx.set_cookies(Cookies::parse(&format!("{SESSION_COOKIE}={value}")));
        }
        ctx
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new(SECRET);
        let id = Uuid::now_v7();
        let value = signer.sign(&id);

        assert_eq!(signer.verify(&value), Some(id));
        assert_eq!(CookieSigner::new("other").verify(&value), None);
        assert_eq!(signer.verify(&format!("{id}.forged")), None);
        assert_eq!(signer.verify("not-a-cookie"), None);
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        let signer = CookieSigner::new("session-secret");
        let id = Uuid::parse_str("0191f6a2-7b3c-7def-8abc-0123456789ab").unwrap();

        assert_eq!(
            signer.sign(&id),
            "0191f6a2-7b3c-7def-8abc-0123456789ab.g3p9qtLLuT_vDUfTU_nA9GH5X0fDW1ZPNt5tUl_bhGs"
        );
        let truncated = "0191f6a2-7b3c-7def-8abc-0123456789ab.g3p9qtLLuT_vDUfTU_nA9GH5X0fDW1ZPNt5tUl";
        assert_eq!(signer.verify(truncated), None);
    }

    #[test]
    fn test_signer_debug_redacts_secret() {
        let rendered = format!("{:?}", CookieSigner::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_session_expiry() {
        let session = Session::new(Duration::from_secs(60));
        assert!(!session.is_expired());
        assert!(session.is_expired_at(session.expires_at()));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_store_drops_expired_on_lookup() {
        let store = SessionStore::new();
        let expired = Session::new(Duration::ZERO);
        let live = Session::new(Duration::from_secs(60));
        let (expired_id, live_id) = (expired.id(), live.id());
        store.save(expired);
        store.save(live);

        assert!(store.get(&expired_id).is_none());
        assert!(store.get(&live_id).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sweep() {
        let store = SessionStore::new();
        store.save(Session::new(Duration::ZERO));
        store.save(Session::new(Duration::ZERO));
        store.save(Session::new(Duration::from_secs(60)));

        assert_eq!(store.sweep(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_first_request_issues_cookie() {
        let mw = SessionMiddleware::new(SECRET);
        let mut ctx = ctx_with_cookie(None);

        let flow = mw.on_request(&mut ctx, request()).await.unwrap();
        assert!(matches!(flow, Flow::Continue(_)));
        let session_id = ctx.session().unwrap().id();
        assert_eq!(mw.store().len(), 1);

        let mut response = Response::empty(StatusCode::OK);
        mw.on_response(&ctx, &mut response);

        let cookie = set_cookie(&response);
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}={session_id}.")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_secure_flag() {
        let mw = SessionMiddleware::new(SECRET).secure(true);
        let mut ctx = ctx_with_cookie(None);
        mw.on_request(&mut ctx, request()).await.unwrap();

        let mut response = Response::empty(StatusCode::OK);
        mw.on_response(&ctx, &mut response);
        assert!(set_cookie(&response).contains("; Secure"));
    }

    #[tokio::test]
    async fn test_valid_cookie_resumes_session() {
        let mw = SessionMiddleware::new(SECRET);
        let mut existing = Session::new(DEFAULT_SESSION_TTL);
        existing.set_user(Some(SessionUser::new("u-1")));
        mw.store().save(existing.clone());

        let cookie = mw.signer().sign(&existing.id());
        let mut ctx = ctx_with_cookie(Some(&cookie));
        mw.on_request(&mut ctx, request()).await.unwrap();

        assert_eq!(ctx.session().unwrap().id(), existing.id());
        assert_eq!(ctx.user().unwrap().id, "u-1");
    }

    #[tokio::test]
    async fn test_tampered_cookie_gets_new_session() {
        let mw = SessionMiddleware::new(SECRET);
        let existing = Session::new(DEFAULT_SESSION_TTL);
        mw.store().save(existing.clone());

        let forged = CookieSigner::new("attacker").sign(&existing.id());
        let mut ctx = ctx_with_cookie(Some(&forged));
        mw.on_request(&mut ctx, request()).await.unwrap();

        assert_ne!(ctx.session().unwrap().id(), existing.id());
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let mw = SessionMiddleware::new(SECRET);
        let expired = Session::new(Duration::ZERO);
        mw.store().save(expired.clone());

        let cookie = mw.signer().sign(&expired.id());
        let mut ctx = ctx_with_cookie(Some(&cookie));
        mw.on_request(&mut ctx, request()).await.unwrap();

        assert_ne!(ctx.session().unwrap().id(), expired.id());
    }

    #[tokio::test]
    async fn test_on_response_persists_user_change() {
        let mw = SessionMiddleware::new(SECRET);
        let mut ctx = ctx_with_cookie(None);
        mw.on_request(&mut ctx, request()).await.unwrap();

        ctx.session_mut()
            .unwrap()
            .set_user(Some(SessionUser::new("u-2")));
        let id = ctx.session().unwrap().id();

        let mut response = Response::empty(StatusCode::OK);
        mw.on_response(&ctx, &mut response);

        assert_eq!(mw.store().get(&id).unwrap().user().unwrap().id, "u-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task() {
        let store = SessionStore::new();
        store.save(Session::new(Duration::ZERO));
        let handle = store.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert!(store.is_empty());
        handle.abort();
    }
}
