//! Agent Core: orchestration layer for the weather assistant.
//!
//! Submodules:
//! - `orchestrator`: The tool-calling loop for one user turn
//! - `tool_router`: `ToolProvider` seam plus argument/result conversions
//! - `retry`: Rate-limit backoff for model calls
//! - `response_analysis`: Final-text extraction with an apology fallback
//! - `conversation`: In-memory history per session
//! - `prompt`: The date-stamped system instruction
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod prompt;
pub mod response_analysis;
pub mod retry;
pub mod tool_router;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use conversation::ConversationManager;
pub use errors::AgentError;
pub use orchestrator::{LoopSettings, Orchestrator};
pub use retry::RetryPolicy;
pub use tool_router::ToolProvider;
pub use types::{HistoryEntry, HistoryRole, ToolInvocationRecord, TurnOutcome};
