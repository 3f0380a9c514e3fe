//! Thin wrapper around the HTTP transport.
//!
//! Requests and responses are plain data so callers can build, inspect, and
//! persist them without touching the underlying client. All failures surface
//! as [`CapabilityError`] values; nothing here panics across the boundary.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{CapabilityError, Result};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods the capability surface supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// A request to be issued through [`HttpClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn post(url: &str, body: String) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers: HashMap::new(),
            body: Some(body),
        }
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success response into [`CapabilityError::Status`].
    pub fn into_result(self) -> Result<HttpResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CapabilityError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// The `Retry-After` header as whole seconds, if present and numeric.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.parse().ok())
    }
}

/// Asynchronous HTTP client shared across requests.
///
/// Network I/O is the only side effect; no host state is touched. Callers
/// must not assume synchronous completion — completion is observed by
/// awaiting the returned future.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Network(format!("failed to build http client: {e}")))?;
        Ok(Self { inner })
    }

    /// Issue a request and collect the full response body.
    pub async fn issue(&self, request: &HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(url = %request.url, method = ?request.method, "issuing request");

        let mut builder = match request.method {
            HttpMethod::Get => self.inner.get(&request.url),
            HttpMethod::Post => self.inner.post(&request.url),
            HttpMethod::Delete => self.inner.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }
        let body = response.text().await?;

        tracing::debug!(status, bytes = body.len(), "request completed");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Issue a request that can be aborted through `token`.
    ///
    /// Returns [`CapabilityError::Cancelled`] when the token fires before the
    /// exchange completes. Cancelling a request that already completed has no
    /// effect, and cancelling the token twice is a no-op.
    pub async fn issue_cancellable(
        &self,
        request: &HttpRequest,
        token: &CancellationToken,
    ) -> Result<HttpResponse> {
        match token.run_until_cancelled(self.issue(request)).await {
            Some(result) => result,
            None => {
                tracing::debug!(url = %request.url, "request cancelled");
                Err(CapabilityError::Cancelled)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
