//! MCP Client error types.

use thiserror::Error;

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process could not be launched.
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// A send was attempted without a live transport.
    #[error("server '{name}' is not connected")]
    NotConnected {
        name: String,
    },

    /// I/O or serialization failure while talking to the server.
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// A line of server output was not valid JSON.
    #[error("malformed message from server '{server}': {reason}")]
    ParseError {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server error [{code}]: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// No response arrived before the per-request deadline.
    #[error("request '{method}' timed out after {timeout_ms}ms")]
    Timeout {
        method: String,
        timeout_ms: u64,
    },
}

impl McpError {
    /// Whether the error means the sidecar is unreachable rather than the
    /// individual request having failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            McpError::NotConnected { .. } | McpError::SpawnFailed { .. } | McpError::InitFailed { .. }
        )
    }
}
