//! Credentialed HTTP transport for the remote monitoring API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const API_KEY_HEADER: &str = "X-Api-Key";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP transport with the account API key attached to every request.
///
/// One `ApiClient` is shared read-only by every component of a
/// reconciliation run; the key is installed once as a default header at
/// construction. Requests are never retried here; any timeout is the
/// transport's default.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Build a transport for the given API base URL and account key.
    pub fn new(base_url: &str, api_key: &str) -> SyncResult<Self> {
        if api_key.is_empty() {
            return Err(SyncError::Config("API key must not be empty".into()));
        }
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| SyncError::Config(format!("invalid API key: {e}")))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .default_headers(headers)
            .user_agent(concat!("vigil-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL of the remote API, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET an absolute URL with optional query parameters.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> SyncResult<Response> {
        debug!(url, "GET");
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        Self::check_status(response).await
    }

    /// PUT to an API path with query parameters.
    pub async fn put(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<Response> {
        let url = self.url(path);
        debug!(url = %url, "PUT");
        let response = self.http.put(&url).query(query).send().await?;
        Self::check_status(response).await
    }

    /// DELETE an API path with query parameters.
    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<Response> {
        let url = self.url(path);
        debug!(url = %url, "DELETE");
        let mut request = self.http.delete(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        Self::check_status(response).await
    }

    /// Map a non-success status to [`SyncError::Api`], consuming the body
    /// as the error detail.
    async fn check_status(response: Response) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err(SyncError::Api {
            status: status.as_u16(),
            url,
            detail,
        })
    }
}
