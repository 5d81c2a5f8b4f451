//! The backend client handle.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use storefront_config::StorefrontConfig;

use crate::BackendError;

/// Table probed by the startup connectivity check.
pub const CONNECTION_CHECK_TABLE: &str = "test_table";

const REST_PREFIX: &str = "rest/v1/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An equality filter on one column (`column=eq.value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    /// Matches rows where `column` equals `value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Shared handle to the backend service.
///
/// Cheap to clone; every clone talks through the same connection pool with
/// the same credentials.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: Url,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Builds a client for `url` authenticated with `key`.
    ///
    /// # Errors
    ///
    /// [`BackendError::InvalidUrl`] unless `url` is an absolute http(s) URL,
    /// [`BackendError::InvalidKey`] if `key` is not a valid header value.
    pub fn new(url: &str, key: &str) -> Result<Self, BackendError> {
        let mut base_url =
            Url::parse(url.trim()).map_err(|e| BackendError::invalid_url(url, e.to_string()))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::invalid_url(url, "scheme must be http or https"));
        }
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(BackendError::invalid_url(url, "URL has no host"));
        }

        // Url::join drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut apikey = HeaderValue::from_str(key).map_err(|_| BackendError::InvalidKey)?;
        apikey.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| BackendError::InvalidKey)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner { http, base_url }),
        })
    }

    /// Builds the client from validated configuration.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, BackendError> {
        Self::new(&config.backend_url, &config.backend_key)
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// REST endpoint for `table`.
    pub fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        if table.is_empty() || table.contains(['/', '?', '#', '%']) {
            return Err(BackendError::InvalidTable(table.to_string()));
        }
        self.inner
            .base_url
            .join(&format!("{REST_PREFIX}{table}"))
            .map_err(|_| BackendError::InvalidTable(table.to_string()))
    }

    /// Reads up to `limit` rows from `table`.
    pub async fn select(&self, table: &str, limit: usize) -> Result<Vec<Value>, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("limit", &limit.to_string());

        self.execute(self.inner.http.request(Method::GET, url)).await
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table)?;
        let request = self
            .inner
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .json(row);
        self.execute(request).await
    }

    /// Applies `patch` to rows matching every filter.
    pub async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &Value,
    ) -> Result<Vec<Value>, BackendError> {
        let url = self.filtered_url(table, filters)?;
        let request = self
            .inner
            .http
            .patch(url)
            .header("Prefer", "return=representation")
            .json(patch);
        self.execute(request).await
    }

    /// Deletes rows matching every filter.
    pub async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        let url = self.filtered_url(table, filters)?;
        let request = self
            .inner
            .http
            .delete(url)
            .header("Prefer", "return=representation");
        self.execute(request).await
    }

    /// Probes the service by reading one row from `table`.
    ///
    /// Never fails; the outcome is logged and returned.
    pub async fn check_connection(&self, table: &str) -> bool {
        match self.select(table, 1).await {
            Ok(_) => {
                tracing::info!(table, "backend connection established");
                true
            }
            Err(e) => {
                tracing::warn!(table, error = %e, "backend connection check failed");
                false
            }
        }
    }

    fn filtered_url(&self, table: &str, filters: &[Filter]) -> Result<Url, BackendError> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
        }
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<Value>, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(other) => Ok(vec![other]),
            Err(e) => Err(BackendError::Status {
                status: status.as_u16(),
                message: format!("undecodable response body: {e}"),
            }),
        }
    }
}
