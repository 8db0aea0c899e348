//! Shared types for the agent core.
//!
//! Conversation history entries and the per-turn outcome returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inference::types::Content;

// ─── Conversation History ───────────────────────────────────────────────────

/// Who said a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// A single message stored in conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: content.into(),
        }
    }

    /// Convert to a model content turn (`assistant` becomes `model`).
    pub fn to_content(&self) -> Content {
        match self.role {
            HistoryRole::User => Content::user_text(&self.content),
            HistoryRole::Assistant => Content::model_text(&self.content),
        }
    }
}

// ─── Turn Outcome ───────────────────────────────────────────────────────────

/// One tool call made while answering a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

/// The result of processing one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Final answer. Never empty.
    #[serde(rename = "content")]
    pub text: String,
    #[serde(rename = "toolCalls")]
    pub tool_invocations: Vec<ToolInvocationRecord>,
}
