//! HTTP server.
//!
//! Accepts HTTP/1.1 connections with hyper, converts each request into the
//! pipeline's buffered form, and hands it to the [`InvocationAdapter`].
//! Bodies are read up to the body limit; a declared or streamed body past it
//! is answered with `413` without buffering the rest.
//! On shutdown the accept loop stops and open connections get up to the
//! shutdown timeout to finish.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{header, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use storefront_core::ErrorRecord;
use storefront_middleware::stages::body::DEFAULT_BODY_LIMIT;
use storefront_middleware::Response;

use crate::error::ServerError;
use crate::invocation::InvocationAdapter;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Default time open connections get to finish after shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// The storefront HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// use storefront_server::{App, Server};
///
/// let app = App::new(&config, backend);
/// Server::new(app.adapter().clone(), config.bind_addr()).run().await?;
/// ```
#[derive(Debug)]
pub struct Server {
    adapter: Arc<InvocationAdapter>,
    addr: String,
    shutdown_timeout: Duration,
    body_limit: usize,
}

impl Server {
    /// A server for `adapter` that will bind `addr` (`host:port`).
    #[must_use]
    pub fn new(adapter: Arc<InvocationAdapter>, addr: impl Into<String>) -> Self {
        Self {
            adapter,
            addr: addr.into(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Sets the drain timeout.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the largest request body read into memory, in bytes.
    #[must_use]
    pub const fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// The configured bind address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Binds and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds and serves until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr.clone(),
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        tracing::info!(addr = %local_addr, "storefront listening");

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let adapter = Arc::clone(&self.adapter);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            let body_limit = self.body_limit;

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(adapter, stream, remote_addr, body_limit, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            active = tracker.active_connections(),
            timeout_ms = u64::try_from(self.shutdown_timeout.as_millis()).unwrap_or(u64::MAX),
            "draining connections"
        );

        tokio::select! {
            () = tracker.wait_for_drain() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(self.shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("storefront stopped");
        Ok(())
    }
}

async fn handle_connection(
    adapter: Arc<InvocationAdapter>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    body_limit: usize,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |request: http::Request<Incoming>| {
        let adapter = Arc::clone(&adapter);
        async move { Ok::<_, Infallible>(handle_request(&adapter, request, body_limit).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            tracing::debug!(remote = %remote_addr, "finishing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn handle_request(
    adapter: &InvocationAdapter,
    request: http::Request<Incoming>,
    body_limit: usize,
) -> Response {
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > body_limit) {
        return adapter.reject(parts, too_large(body_limit));
    }

    let bytes = match Limited::new(body, body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return adapter.reject(parts, too_large(body_limit));
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return adapter.reject(parts, ErrorRecord::bad_request("Failed to read request body"));
        }
    };

    adapter
        .invoke(http::Request::from_parts(parts, Full::new(bytes)))
        .await
}

fn declared_length(headers: &http::HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn too_large(limit: usize) -> ErrorRecord {
    ErrorRecord::bad_request(format!("Request body exceeds {limit} bytes"))
        .with_status(StatusCode::PAYLOAD_TOO_LARGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_middleware::Pipeline;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn adapter() -> Arc<InvocationAdapter> {
        Arc::new(InvocationAdapter::new(Pipeline::builder().build()))
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let result = Server::new(adapter(), addr)
            .run_with_shutdown(ShutdownSignal::new())
            .await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    async fn spawn(server: Server) -> (SocketAddr, ShutdownSignal) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let stop = shutdown.clone();
        tokio::spawn(async move { server.serve(listener, stop).await });
        (addr, shutdown)
    }

    async fn status_line(addr: SocketAddr, head: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(head.as_bytes()).await.unwrap();

        let mut buf = vec![0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("response within timeout")
            .unwrap();
        String::from_utf8_lossy(&buf[..n]).lines().next().unwrap_or_default().to_string()
    }

    #[test]
    fn test_declared_length() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(42));
        headers.insert(header::CONTENT_LENGTH, "many".parse().unwrap());
        assert_eq!(declared_length(&headers), None);
    }

    #[tokio::test]
    async fn test_oversized_declared_body_is_rejected_before_reading() {
        let server = Server::new(adapter(), "127.0.0.1:0").body_limit(1024);
        let (addr, shutdown) = spawn(server).await;

        // The body is never sent, so only the declared length can trigger the answer.
        let line = status_line(
            addr,
            "POST /api/cart HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: 10485760\r\n\r\n",
        )
        .await;

        assert!(line.starts_with("HTTP/1.1 413"), "{line}");
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_oversized_chunked_body_is_rejected() {
        let server = Server::new(adapter(), "127.0.0.1:0").body_limit(8);
        let (addr, shutdown) = spawn(server).await;

        let line = status_line(
            addr,
            "POST /api/cart HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\n\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n",
        )
        .await;

        assert!(line.starts_with("HTTP/1.1 413"), "{line}");
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Server::new(adapter(), "127.0.0.1:0")
                .shutdown_timeout(Duration::from_millis(100))
                .run_with_shutdown(shutdown),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
