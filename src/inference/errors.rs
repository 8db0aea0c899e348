//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to
//! build meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the model endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// HTTP 429: the account is out of quota or being throttled.
    #[error("rate limited by model endpoint: {body}")]
    RateLimited { body: String },

    /// Any other non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body was not the JSON shape we expect.
    #[error("failed to parse model response: {reason}")]
    ResponseParse { reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Whether this error should be retried with backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InferenceError::RateLimited { .. })
    }

    /// Whether this error points at a missing, rejected, or invalid API key.
    pub fn is_auth_error(&self) -> bool {
        match self {
            InferenceError::HttpError { status: 401 | 403, .. } => true,
            InferenceError::HttpError { status: 400, body } => body.contains("API key"),
            InferenceError::ConfigError { reason } => reason.contains("API key"),
            _ => false,
        }
    }

    /// Extract the error body text, if this error carries one.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } | InferenceError::RateLimited { body } => {
                Some(body)
            }
            _ => None,
        }
    }
}
