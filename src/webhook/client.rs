//! Webhook exchange: POST, single GET fallback, reply parsing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use super::deadline::with_deadline;
use super::transport::{HttpTransport, WebhookRequest, WebhookResponse, WebhookTransport};
use crate::config::WebhookConfig;
use crate::error::{ChatError, Result};

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Reply text used when the webhook answers without a `message` field.
pub const DEFAULT_EMPTY_REPLY: &str = "No message received";

/// Client for the chat webhook.
///
/// One call to [`exchange`](Self::exchange) turns a user message into the
/// assistant's reply text, or a classified [`ChatError`].
#[derive(Clone)]
pub struct WebhookClient {
    endpoint: Url,
    timeout: Duration,
    empty_reply: String,
    transport: Arc<dyn WebhookTransport>,
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl WebhookClient {
    /// Create a client over HTTP for the given endpoint.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self::with_transport(endpoint, Arc::new(HttpTransport::new()))
    }

    /// Create a client from loaded configuration.
    #[must_use]
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(config.endpoint.clone()).timeout(config.timeout())
    }

    /// Create a client with a custom transport.
    #[must_use]
    pub fn with_transport(endpoint: Url, transport: Arc<dyn WebhookTransport>) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            empty_reply: DEFAULT_EMPTY_REPLY.to_string(),
            transport,
        }
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the reply text used when the webhook returns no `message`.
    #[must_use]
    pub fn empty_reply(mut self, text: impl Into<String>) -> Self {
        self.empty_reply = text.into();
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `text` to the webhook and return the reply text.
    ///
    /// The POST attempt falls back to exactly one GET when it gets no
    /// response (network failure or deadline). An HTTP error status is
    /// final and never falls back.
    pub async fn exchange(&self, text: &str) -> Result<String> {
        let post = WebhookRequest::Post {
            url: self.endpoint.clone(),
            body: json!({ "text": text }),
        };

        let response = match self.attempt(post).await {
            Ok(resp) => resp,
            Err(err) if err.is_unanswered() => {
                warn!(
                    name: "webhook.post.failed",
                    error = %err,
                    "POST failed, falling back to GET"
                );
                let get = WebhookRequest::Get {
                    url: self.fallback_url(text),
                };
                self.attempt(get).await?
            }
            Err(err) => return Err(err),
        };

        if !response.is_success() {
            warn!(
                name: "webhook.response.status",
                status = response.status,
                "Webhook returned error status"
            );
            return Err(ChatError::HttpStatus {
                status: response.status,
                reason: response.reason,
            });
        }

        self.parse_reply(&response.body)
    }

    /// GET URL carrying the message as the `text` query parameter.
    ///
    /// Query parameters already on the endpoint are kept.
    pub fn fallback_url(&self, text: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("text", text);
        url
    }

    async fn attempt(&self, request: WebhookRequest) -> Result<WebhookResponse> {
        let method = request.method();
        info!(
            name: "webhook.request.sent",
            method,
            url = %request.url(),
            "Sending webhook request"
        );

        match with_deadline(self.timeout, self.transport.execute(request)).await {
            Ok(Ok(resp)) => {
                info!(
                    name: "webhook.response.received",
                    method,
                    status = resp.status,
                    "Webhook responded"
                );
                Ok(resp)
            }
            Ok(Err(err)) => Err(ChatError::NetworkFailure(err.0)),
            Err(elapsed) => Err(ChatError::Timeout {
                after: elapsed.after,
            }),
        }
    }

    fn parse_reply(&self, body: &str) -> Result<String> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ChatError::Unknown(e.to_string()))?;

        let reply = value
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map_or_else(|| self.empty_reply.clone(), ToString::to_string);

        Ok(reply)
    }
}
