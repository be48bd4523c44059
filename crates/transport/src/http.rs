//! Reqwest-backed transport for OpenAI-compatible chat-completion APIs.
//!
//! Handles the vast majority of inference gateways since most expose an
//! OpenAI-compatible `/v1/chat/completions` endpoint.

use async_trait::async_trait;
use openrelay_core::error::TransportError;
use openrelay_core::transport::{ChatRequest, ChatResponse, Transport};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An HTTP transport for OpenAI-compatible endpoints.
pub struct HttpTransport {
    name: String,
    base_url: String,
    api_key: String,
    /// Optional attribution headers (`HTTP-Referer`, `X-Title`) some
    /// gateways use for rankings and dashboards.
    referer: Option<String>,
    title: Option<String>,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport for the given endpoint.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, TransportError> {
        Self::with_timeout(name, base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a new transport with a custom request timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            referer: None,
            title: None,
            client,
        })
    }

    /// Create an OpenRouter transport (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, TransportError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI transport (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, TransportError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Set attribution headers sent with every request.
    pub fn with_attribution(
        mut self,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.referer = Some(referer.into());
        self.title = Some(title.into());
        self
    }

    /// Parse a `Retry-After` header value (seconds form only).
    fn retry_after_secs(response: &reqwest::Response) -> u64 {
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            transport = %self.name,
            model = request.model.as_deref().unwrap_or("<fallback list>"),
            messages = request.messages.len(),
            "Sending completion request"
        );

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");

        if let Some(referer) = &self.referer {
            req = req.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            req = req.header("X-Title", title);
        }

        let response = req.json(request).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(TransportError::RateLimited {
                retry_after_secs: Self::retry_after_secs(&response),
            });
        }

        if status == 401 {
            return Err(TransportError::AuthenticationFailed(
                "Invalid API key".into(),
            ));
        }

        if status == 403 {
            return Err(TransportError::AccessDenied(
                "Insufficient permissions for this model or endpoint".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Transport returned error");
            return Err(TransportError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        // A 2xx body can still carry a structured error object; the
        // orchestration loop classifies that, not the transport.
        response.json().await.map_err(|e| TransportError::ApiError {
            status_code: status,
            message: format!("Failed to parse response: {e}"),
        })
    }
}
