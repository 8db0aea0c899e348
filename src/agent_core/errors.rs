//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::mcp_client::McpError;

/// Errors that can occur while processing a user turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The user message was empty or whitespace.
    #[error("message is required")]
    EmptyMessage,

    /// A tool call (or the catalog fetch) failed.
    #[error("tool execution failed: {0}")]
    Tool(#[from] McpError),

    /// The model request failed (after any rate-limit retries).
    #[error("model request failed: {0}")]
    Model(#[from] InferenceError),
}

impl AgentError {
    /// A message safe to show the user. Diagnostics stay in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            AgentError::EmptyMessage => "Message is required.",
            AgentError::Model(e) if e.is_rate_limited() => {
                "API quota exceeded. Please wait a moment and try again."
            }
            AgentError::Model(InferenceError::HttpError { status: 400, body })
                if body.contains("API key") =>
            {
                "Invalid API key. Please check your configuration."
            }
            AgentError::Model(e) if e.is_auth_error() => {
                "API key is missing or invalid. Please check your configuration."
            }
            AgentError::Model(InferenceError::ConnectionFailed { .. })
            | AgentError::Model(InferenceError::Timeout { .. }) => {
                "The language model could not be reached. Please try again later."
            }
            AgentError::Tool(e) if e.is_unavailable() => {
                "The weather service is currently unavailable."
            }
            AgentError::Tool(_) => "The weather service failed to answer. Please try again.",
            AgentError::Model(_) => "An internal error occurred. Please try again.",
        }
    }
}
