//! Chat commands: one user message in, one assistant reply out.
//!
//! Bridges the caller to the agent core (ConversationManager and the
//! Orchestrator). History is kept per session id and truncated after each
//! successful turn.

use serde::Serialize;

use crate::agent_core::prompt::current_system_prompt;
use crate::agent_core::{HistoryRole, ToolInvocationRecord, ToolProvider, TurnOutcome};
use crate::inference::ModelCapability;
use crate::AppState;

use super::CommandError;

// ─── Response Types ─────────────────────────────────────────────────────────

/// Reply to a chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(rename = "toolCalls")]
    pub tool_calls: Vec<ToolInvocationRecord>,
}

impl From<TurnOutcome> for ChatReply {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            content: outcome.text,
            tool_calls: outcome.tool_invocations,
        }
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// Send a user message and get the assistant's reply.
///
/// The user entry is recorded before the turn runs and stays in history if
/// the turn fails.
pub async fn send_message<M, T>(
    state: &AppState<M, T>,
    session_id: &str,
    message: &str,
) -> Result<ChatReply, CommandError>
where
    M: ModelCapability,
    T: ToolProvider,
{
    if message.trim().is_empty() {
        return Err(CommandError::bad_request("Message is required"));
    }

    let conversations = &state.conversations;
    conversations.append(session_id, HistoryRole::User, message);
    let history = conversations.history(session_id);
    tracing::info!(session_id, history_len = history.len(), "chat message received");

    let system = current_system_prompt();
    match state.orchestrator.process_turn(message, &history, &system).await {
        Ok(outcome) => {
            conversations.append(session_id, HistoryRole::Assistant, &outcome.text);
            conversations.truncate(session_id);
            Ok(outcome.into())
        }
        Err(e) => {
            tracing::error!(session_id, error = %e, "chat turn failed");
            Err(CommandError::from(&e))
        }
    }
}

/// Forget a session's history. Returns whether the session existed.
pub fn reset_session<M, T>(state: &AppState<M, T>, session_id: &str) -> bool {
    let existed = state.conversations.clear(session_id);
    tracing::info!(session_id, existed, "session reset");
    existed
}

// ─── Tests ──────────────────────────────────────────────────────────────────
