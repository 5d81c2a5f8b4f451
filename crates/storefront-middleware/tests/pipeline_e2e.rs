//! End-to-end pipeline integration tests.
//!
//! Every real stage, in production order, in front of a small echo
//! endpoint that reports what the stages left in the context.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use storefront_backend::BackendClient;
use storefront_core::{ErrorRecord, SessionUser};
use storefront_middleware::{
    stages::{
        AccessLogMiddleware, BackendInjectionMiddleware, BodyParserMiddleware, CookieMiddleware,
        CorsMiddleware, ErrorNormalizer, SecurityHeadersMiddleware, SessionMiddleware,
        SessionStore, StaticAssetsMiddleware, SESSION_COOKIE,
    },
    BoxFuture, Endpoint, MiddlewareContext, Pipeline, Request, Response, ResponseExt,
};
use tempfile::TempDir;

const SECRET: &str = "integration-secret";

/// Reports context state, signs in on `/signin`, fails on `/boom`.
struct Echo;

impl Endpoint for Echo {
    fn call<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Result<Response, ErrorRecord>> {
        Box::pin(async move {
            match request.uri().path() {
                "/boom" => Err(ErrorRecord::internal("endpoint failure").with_trace("endpoint stack")),
                "/signin" => {
                    if let Some(session) = ctx.session_mut() {
                        session.set_user(Some(SessionUser::new("u-9")));
                    }
                    Ok(Response::redirect("/"))
                }
                "/echo" => Ok(Response::json(
                    StatusCode::OK,
                    &json!({
                        "user": ctx.user().map(|u| u.id.clone()),
                        "backend": ctx.backend().is_some(),
                        "body": ctx.body().as_json().cloned(),
                        "theme": ctx.cookies().get("theme"),
                    }),
                )),
                _ => Err(ErrorRecord::not_found()),
            }
        })
    }
}

struct Harness {
    pipeline: Pipeline,
    store: SessionStore,
    _static_root: TempDir,
}

fn harness(production: bool) -> Harness {
    let static_root = TempDir::new().unwrap();
    std::fs::write(static_root.path().join("robots.txt"), "User-agent: *").unwrap();

    let store = SessionStore::new();
    let backend = BackendClient::new("http://127.0.0.1:54321", "anon-key").unwrap();

    let pipeline = Pipeline::builder()
        .add_stage(SecurityHeadersMiddleware::new())
        .add_stage(CorsMiddleware::default())
        .add_stage(AccessLogMiddleware::new())
        .add_stage(BodyParserMiddleware::new())
        .add_stage(CookieMiddleware::new())
        .add_stage(StaticAssetsMiddleware::new(static_root.path()))
        .add_stage(
            SessionMiddleware::new(SECRET)
                .with_store(store.clone())
                .secure(production),
        )
        .add_stage(BackendInjectionMiddleware::new(backend))
        .normalizer(ErrorNormalizer::new().expose_details(!production))
        .endpoint(Echo)
        .build();

    Harness {
        pipeline,
        store,
        _static_root: static_root,
    }
}

fn request(method: Method, path: &str) -> http::request::Builder {
    http::Request::builder().method(method).uri(path)
}

fn empty(builder: http::request::Builder) -> Request {
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .map(str::to_string)
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_full_chain_populates_context() {
    let h = harness(false);
    let req = request(Method::POST, "/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, "theme=dark")
        .body(Full::new(Bytes::from_static(br#"{"qty":1}"#)))
        .unwrap();

    let response = h.pipeline.handle(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    assert!(session_cookie(&response).is_some());
    assert_eq!(
        body_json(response).await,
        json!({"user": null, "backend": true, "body": {"qty": 1}, "theme": "dark"})
    );
}

#[tokio::test]
async fn test_options_short_circuits_with_headers() {
    let h = harness(false);
    let response = h
        .pipeline
        .handle(empty(request(Method::OPTIONS, "/anything")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("access-control-allow-methods").unwrap(), "GET, POST, PUT, DELETE, OPTIONS");
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "SAMEORIGIN");
    // never reached the session stage
    assert!(session_cookie(&response).is_none());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let h = harness(false);
    let req = request(Method::POST, "/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-requested-with", "XMLHttpRequest")
        .body(Full::new(Bytes::from_static(b"{not json")))
        .unwrap();

    let response = h.pipeline.handle(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed JSON body"));
}

#[tokio::test]
async fn test_static_file_served_before_session() {
    let h = harness(false);
    let response = h
        .pipeline
        .handle(empty(request(Method::GET, "/robots.txt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_traversal_falls_through_to_404() {
    let h = harness(false);
    let response = h
        .pipeline
        .handle(empty(
            request(Method::GET, "/../etc/passwd").header(header::ACCEPT, "application/json"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": {"message": "Not Found"}})
    );
}

#[tokio::test]
async fn test_handler_fault_exposes_stack_outside_production() {
    let dev = harness(false);
    let response = dev
        .pipeline
        .handle(empty(request(Method::GET, "/api/boom").header("x-requested-with", "XMLHttpRequest")))
        .await
        .unwrap();
    // /api/boom is not an echo route
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = dev
        .pipeline
        .handle(empty(request(Method::GET, "/boom").header("x-requested-with", "XMLHttpRequest")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": {"message": "endpoint failure", "stack": "endpoint stack"}})
    );

    let prod = harness(true);
    let response = prod
        .pipeline
        .handle(empty(request(Method::GET, "/boom").header("x-requested-with", "XMLHttpRequest")))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"error": {"message": "endpoint failure"}})
    );
}

#[tokio::test]
async fn test_session_survives_across_requests() {
    let h = harness(false);

    let first = h
        .pipeline
        .handle(empty(request(Method::GET, "/signin")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::FOUND);
    let cookie = cookie_pair(&session_cookie(&first).unwrap());

    let second = h
        .pipeline
        .handle(empty(request(Method::GET, "/echo").header(header::COOKIE, cookie.as_str())))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["user"], "u-9");
}

#[tokio::test]
async fn test_tampered_session_cookie_is_anonymous() {
    let h = harness(false);

    let first = h
        .pipeline
        .handle(empty(request(Method::GET, "/signin")))
        .await
        .unwrap();
    let cookie = cookie_pair(&session_cookie(&first).unwrap());
    let tampered = format!("{cookie}x");

    let second = h
        .pipeline
        .handle(empty(request(Method::GET, "/echo").header(header::COOKIE, tampered.as_str())))
        .await
        .unwrap();
    let reissued = cookie_pair(&session_cookie(&second).unwrap());
    assert_ne!(reissued, cookie);
    assert_eq!(body_json(second).await["user"], Value::Null);
}

#[tokio::test]
async fn test_secure_cookie_only_in_production() {
    let dev = harness(false)
        .pipeline
        .handle(empty(request(Method::GET, "/echo")))
        .await
        .unwrap();
    assert!(!session_cookie(&dev).unwrap().contains("Secure"));

    let prod = harness(true)
        .pipeline
        .handle(empty(request(Method::GET, "/echo")))
        .await
        .unwrap();
    assert!(session_cookie(&prod).unwrap().contains("; Secure"));
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let h = Arc::new(harness(false));

    let mut handles = Vec::new();
    for i in 0..8 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            let req = request(Method::POST, "/echo")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(format!(r#"{{"n":{i}}}"#))))
                .unwrap();
            let response = h.pipeline.handle(req).await.unwrap();
            (i, body_json(response).await)
        }));
    }

    for handle in handles {
        let (i, body) = handle.await.unwrap();
        assert_eq!(body["body"]["n"], i);
    }
    assert_eq!(h.store.len(), 8);
}
