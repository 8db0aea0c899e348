//! MCP Client: JSON-RPC over stdio transport for the weather tool server.
//!
//! This module handles:
//! - Spawning the tool server child process
//! - Framing its stdout into JSON-RPC messages
//! - Correlating responses with outstanding requests by id
//! - The `initialize`, `tools/list` and `tools/call` operations
//!
//! The client is used by the agent loop (through `ToolProvider`) and by the
//! direct weather commands.

pub mod client;
pub mod correlation;
pub mod errors;
pub mod framing;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{normalize_tool_result, McpClient};
pub use errors::McpError;
pub use types::{McpToolDefinition, ServerConfig};
