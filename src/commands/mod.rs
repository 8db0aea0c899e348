//! Caller-facing commands.
//!
//! Each command takes the shared [`AppState`](crate::AppState) and returns a
//! serializable value or a [`CommandError`] carrying a message safe to show
//! the user. Diagnostics go to the log, never into the error message.

pub mod chat;
pub mod health;
pub mod weather;

use serde::Serialize;
use thiserror::Error;

use crate::agent_core::AgentError;
use crate::mcp_client::McpError;

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Broad failure class, mapped to an HTTP status by any outer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The caller sent an unusable request.
    BadRequest,
    /// The tool server is not connected.
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

/// A command failure with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl From<&AgentError> for CommandError {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::EmptyMessage => ErrorKind::BadRequest,
            AgentError::Tool(e) if e.is_unavailable() => ErrorKind::Unavailable,
            _ => ErrorKind::Internal,
        };
        Self {
            kind,
            message: err.user_message().to_string(),
        }
    }
}

impl From<McpError> for CommandError {
    fn from(err: McpError) -> Self {
        Self::from(&AgentError::Tool(err))
    }
}
