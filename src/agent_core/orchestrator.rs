//! Agent loop: drives one user turn to a final answer.
//!
//! 1. **Catalog**: fetch tool descriptors and declare them to the model
//! 2. **Ask**: send prior turns plus the composed prompt
//! 3. **Execute**: run every function call the model requests, feed the
//!    results back, and ask again
//! 4. **Answer**: extract the final text once the model stops calling tools
//!
//! Round-trips are bounded per turn. Rate limits are retried with backoff;
//! every other failure ends the turn.

use std::time::Duration;

use crate::inference::{Content, GenerateRequest, ModelCapability, ModelResponse};
use crate::inference::types::FunctionDeclaration;

use super::errors::AgentError;
use super::response_analysis::extract_final_text;
use super::retry::{retry_on_rate_limit, RetryPolicy};
use super::tool_router::{normalize_arguments, to_declaration, to_function_response, ToolProvider};
use super::types::{HistoryEntry, ToolInvocationRecord, TurnOutcome};

// ─── Settings ───────────────────────────────────────────────────────────────

/// Model round-trips per turn, including the initial request.
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 5;

/// Bounds and retry schedules for one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub max_round_trips: usize,
    /// Retry schedule for the first model call.
    pub initial_retry: RetryPolicy,
    /// Retry schedule for calls that carry tool results.
    pub follow_up_retry: RetryPolicy,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            initial_retry: RetryPolicy::new(3, Duration::from_secs(2), 1.5),
            follow_up_retry: RetryPolicy::new(3, Duration::from_secs(6), 1.5),
        }
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Runs the tool-calling loop against a model and a tool provider.
///
/// Holds no per-turn state, so one instance can serve concurrent turns.
pub struct Orchestrator<M, T> {
    model: M,
    tools: T,
    settings: LoopSettings,
}

impl<M, T> Orchestrator<M, T> {
    pub fn new(model: M, tools: T, settings: LoopSettings) -> Self {
        Self {
            model,
            tools,
            settings,
        }
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }
}

impl<M: ModelCapability, T: ToolProvider> Orchestrator<M, T> {
    /// Process one user turn.
    ///
    /// `history` must end with the just-added user entry for `utterance`;
    /// that entry is skipped since the utterance is sent as the composed
    /// prompt instead.
    pub async fn process_turn(
        &self,
        utterance: &str,
        history: &[HistoryEntry],
        system: &str,
    ) -> Result<TurnOutcome, AgentError> {
        if utterance.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let catalog = self.tools.list_tools().await?;
        let declarations: Vec<FunctionDeclaration> = catalog.iter().map(to_declaration).collect();
        tracing::info!(tool_count = declarations.len(), "agent turn started");

        let prior = history.split_last().map(|(_, rest)| rest).unwrap_or_default();
        let mut contents: Vec<Content> = prior.iter().map(HistoryEntry::to_content).collect();
        contents.push(Content::user_text(compose_prompt(system, utterance)));

        let mut response = self
            .ask(&contents, &declarations, &self.settings.initial_retry, "initial")
            .await?;
        let mut round_trips = 1;
        let mut records: Vec<ToolInvocationRecord> = Vec::new();

        loop {
            let calls = response.function_calls();
            if calls.is_empty() {
                break;
            }
            if round_trips >= self.settings.max_round_trips {
                tracing::warn!(
                    round_trips,
                    pending_calls = calls.len(),
                    "round-trip limit reached, answering with current response"
                );
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                let arguments = normalize_arguments(call.args);
                tracing::info!(tool = %call.name, arguments = %arguments, "executing tool call");

                let result = self.tools.call_tool(&call.name, arguments.clone()).await?;
                tracing::debug!(tool = %call.name, result = %result, "tool call returned");

                results.push(to_function_response(&call.name, &result));
                records.push(ToolInvocationRecord {
                    name: call.name,
                    arguments,
                    result,
                });
            }

            contents.push(response.model_content());
            contents.push(Content::function_responses(results));

            response = self
                .ask(&contents, &declarations, &self.settings.follow_up_retry, "follow_up")
                .await?;
            round_trips += 1;
        }

        let text = extract_final_text(&response);
        tracing::info!(
            round_trips,
            tool_calls = records.len(),
            text_len = text.len(),
            "agent turn finished"
        );

        Ok(TurnOutcome {
            text,
            tool_invocations: records,
        })
    }

    async fn ask(
        &self,
        contents: &[Content],
        declarations: &[FunctionDeclaration],
        policy: &RetryPolicy,
        label: &str,
    ) -> Result<ModelResponse, AgentError> {
        let request = GenerateRequest::new(contents.to_vec(), declarations.to_vec());
        let response = retry_on_rate_limit(policy, label, || self.model.generate(&request)).await?;
        Ok(response)
    }
}

/// Prefix the utterance with the system instruction, if any.
pub fn compose_prompt(system: &str, utterance: &str) -> String {
    if system.is_empty() {
        utterance.to_string()
    } else {
        format!("{system}\n\nUser: {utterance}")
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
