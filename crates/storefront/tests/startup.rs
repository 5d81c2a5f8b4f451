//! Startup sequence tests.

use std::time::Duration;

use storefront::config::{ConfigError, ConfigLoader, MapEnv, StorefrontConfig};
use storefront::server::ShutdownSignal;
use tempfile::TempDir;

fn config(backend_url: &str, port: u16, static_dir: &TempDir) -> StorefrontConfig {
    ConfigLoader::from_source(
        MapEnv::new()
            .with("BACKEND_URL", backend_url)
            .with("BACKEND_KEY", "anon-key")
            .with("SESSION_SECRET", "startup-secret")
            .with("HOST", "127.0.0.1")
            .with("PORT", port.to_string())
            .with("STATIC_DIR", static_dir.path().to_string_lossy()),
    )
    .load()
    .unwrap()
}

#[test]
fn test_missing_keys_are_reported_together() {
    let err = ConfigLoader::from_source(MapEnv::new().with("BACKEND_KEY", "  "))
        .load()
        .unwrap_err();

    match err {
        ConfigError::MissingVariables { vars } => {
            assert_eq!(vars, ["BACKEND_URL", "BACKEND_KEY", "SESSION_SECRET"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_binary_exits_nonzero_without_required_keys() {
    let dir = TempDir::new().unwrap();
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_storefront"))
        .env_clear()
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    for key in ["BACKEND_URL", "BACKEND_KEY", "SESSION_SECRET"] {
        assert!(stderr.contains(key), "{key} missing from: {stderr}");
    }
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_bad_backend_url_fails_before_binding() {
    let dir = TempDir::new().unwrap();
    let err = storefront::serve(config("not a url", 0, &dir), ShutdownSignal::new())
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("failed to create backend client"));
}

#[tokio::test]
async fn test_unreachable_backend_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        storefront::serve(config("http://127.0.0.1:1", 0, &dir), shutdown),
    )
    .await
    .unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_port_in_use_is_fatal() {
    let dir = TempDir::new().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = tokio::time::timeout(
        Duration::from_secs(30),
        storefront::serve(config("http://127.0.0.1:1", port, &dir), ShutdownSignal::new()),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(format!("{err:#}").contains("server failed"));
}
