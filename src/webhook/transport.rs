//! HTTP transport seam for webhook attempts.
//!
//! The client only needs "send this request, give me status and body". The
//! [`WebhookTransport`] trait captures that so the exchange logic can be
//! driven by scripted transports in tests.

use serde_json::Value;
use url::Url;

/// A single outbound attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookRequest {
    /// `POST <url>` with a JSON body.
    Post {
        /// Endpoint URL.
        url: Url,
        /// JSON body, `{"text": ...}`.
        body: Value,
    },
    /// `GET <url>`, message already encoded in the query string.
    Get {
        /// Endpoint URL including the `text` query parameter.
        url: Url,
    },
}

impl WebhookRequest {
    /// HTTP method name, for logging.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Post { .. } => "POST",
            Self::Get { .. } => "GET",
        }
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Self::Post { url, .. } | Self::Get { url } => url,
        }
    }
}

/// What came back from the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, empty if unknown.
    pub reason: String,
    /// Raw body text.
    pub body: String,
}

impl WebhookResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The attempt never produced a complete response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Executes webhook attempts.
#[async_trait::async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Send the request and collect the full response.
    async fn execute(&self, request: WebhookRequest) -> Result<WebhookResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport with a default `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a custom `reqwest` client.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl WebhookTransport for HttpTransport {
    async fn execute(&self, request: WebhookRequest) -> Result<WebhookResponse, TransportError> {
        let builder = match request {
            // `.json()` sets Content-Type: application/json
            WebhookRequest::Post { url, body } => self.http.post(url).json(&body),
            WebhookRequest::Get { url } => self.http.get(url),
        };

        let resp = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(format!("reading response body: {e}")))?;

        Ok(WebhookResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
