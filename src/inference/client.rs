//! Gemini inference client.
//!
//! Sends `generateContent` requests to the hosted model and hands back the
//! raw response. Retrying is the agent loop's job; this client makes exactly
//! one HTTP call per [`ModelCapability::generate`].

use std::future::Future;
use std::time::Duration;

use reqwest::Client as HttpClient;
use reqwest::StatusCode;

use super::config::ModelConfig;
use super::errors::InferenceError;
use super::types::{GenerateRequest, ModelResponse};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

// ─── Capability Seam ─────────────────────────────────────────────────────────

/// A model that can answer a `generateContent` request.
///
/// The agent loop is generic over this so tests can script responses.
pub trait ModelCapability: Send + Sync {
    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<ModelResponse, InferenceError>> + Send;
}

// ─── GeminiClient ────────────────────────────────────────────────────────────

/// Client for the Gemini REST endpoint.
pub struct GeminiClient {
    http: HttpClient,
    url: String,
    model_name: String,
    api_key: String,
    request_timeout: Duration,
}

impl GeminiClient {
    /// Create a client from config. Fails when no API key can be resolved.
    ///
    /// Does NOT check connectivity; that happens on the first request.
    pub fn from_config(config: &ModelConfig) -> Result<Self, InferenceError> {
        let api_key = config.resolve_api_key()?;
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let url = config.generate_url();

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            url,
            model_name: config.model_name.clone(),
            api_key,
            request_timeout,
        })
    }

    /// The configured model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send(&self, request: &GenerateRequest) -> Result<ModelResponse, InferenceError> {
        // Log the request metadata (not the full body, it can be large)
        tracing::info!(
            model = %self.model_name,
            content_count = request.contents.len(),
            tool_count = request.declared_tool_count(),
            "model request"
        );

        let response = self
            .http
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: self.request_timeout.as_secs(),
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: self.url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body_text = response.text().await.map_err(|e| InferenceError::ResponseParse {
            reason: format!("failed to read response body: {e}"),
        })?;

        parse_response_body(&body_text)
    }
}

impl ModelCapability for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, InferenceError> {
        self.send(request).await
    }
}

// ─── Response Handling ───────────────────────────────────────────────────────

/// Map a non-2xx status to an error. 429 is the only retryable status.
fn classify_status(status: StatusCode, body: String) -> InferenceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(status = status.as_u16(), "model endpoint rate limited the request");
        InferenceError::RateLimited { body }
    } else {
        tracing::warn!(status = status.as_u16(), body = %body, "model endpoint returned an error");
        InferenceError::HttpError {
            status: status.as_u16(),
            body,
        }
    }
}

/// Parse a successful response body.
fn parse_response_body(body: &str) -> Result<ModelResponse, InferenceError> {
    let raw: serde_json::Value =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
            reason: format!("invalid JSON: {e}"),
        })?;
    Ok(ModelResponse::from_value(raw))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
