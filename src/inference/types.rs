//! Shared types for the inference client.
//!
//! These mirror the Gemini `generateContent` REST shapes, used for both
//! request building and response parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Request Types ───────────────────────────────────────────────────────────

/// Who produced a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn in the request: a role plus its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// A single user turn carrying every tool result from one round.
    pub fn function_responses(responses: Vec<FunctionResponse>) -> Self {
        Self {
            role: Role::User,
            parts: responses.into_iter().map(Part::function_response).collect(),
        }
    }
}

/// A part of a content turn. Exactly one field is normally set.
///
/// `None` fields are omitted on the wire; Gemini rejects parts with
/// explicit `null` members. Fields this crate does not model (e.g.
/// `thoughtSignature`) land in `extra` and are echoed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::default()
        }
    }

    pub fn function_response(response: FunctionResponse) -> Self {
        Self {
            function_response: Some(response),
            ..Self::default()
        }
    }
}

/// A tool invocation requested by the model.
///
/// `args` is kept as raw JSON: the model usually sends an object but may
/// send a string or nothing at all. The agent loop normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// A tool result fed back to the model. `response` must be a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
}

/// Wrapper for `tools[].functionDeclarations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclarations {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Request body for `POST models/{model}:generateContent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclarations>>,
}

impl GenerateRequest {
    /// Build a request, omitting `tools` entirely when there are none.
    pub fn new(contents: Vec<Content>, declarations: Vec<FunctionDeclaration>) -> Self {
        let tools = if declarations.is_empty() {
            None
        } else {
            Some(vec![ToolDeclarations {
                function_declarations: declarations,
            }])
        };
        Self { contents, tools }
    }

    /// Number of declared functions across all tool groups.
    pub fn declared_tool_count(&self) -> usize {
        self.tools
            .as_ref()
            .map(|groups| groups.iter().map(|g| g.function_declarations.len()).sum())
            .unwrap_or(0)
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// A model response, kept as raw JSON.
///
/// Responses vary in shape (top-level `candidates`, a nested `response`
/// envelope, candidate-level `parts`), so accessors probe the raw value
/// instead of relying on a rigid struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub raw: Value,
}

impl ModelResponse {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// `candidates`, or `response.candidates`.
    pub fn candidates(&self) -> Option<&Vec<Value>> {
        self.raw
            .get("candidates")
            .and_then(Value::as_array)
            .or_else(|| {
                self.raw
                    .get("response")
                    .and_then(|r| r.get("candidates"))
                    .and_then(Value::as_array)
            })
    }

    pub fn first_candidate(&self) -> Option<&Value> {
        self.candidates().and_then(|c| c.first())
    }

    /// Parts of the first candidate: `content.parts`, or candidate-level `parts`.
    pub fn candidate_parts(&self) -> Vec<&Value> {
        let Some(candidate) = self.first_candidate() else {
            return Vec::new();
        };
        candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .or_else(|| candidate.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| parts.iter().collect())
            .unwrap_or_default()
    }

    /// Every `functionCall` part of the first candidate, in order.
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.candidate_parts()
            .into_iter()
            .filter_map(|part| part.get("functionCall"))
            .filter_map(|call| serde_json::from_value(call.clone()).ok())
            .collect()
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls().is_empty()
    }

    /// Direct text accessor: a top-level `text` field, or the concatenated
    /// text parts of the first candidate. `None` when there is no text.
    pub fn text(&self) -> Option<String> {
        if let Some(text) = self.raw.get("text").and_then(Value::as_str) {
            return Some(text.to_string());
        }

        let joined: String = self
            .candidate_parts()
            .into_iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    /// The content to echo back before sending tool results.
    ///
    /// Uses the candidate's own content when it parses; otherwise rebuilds a
    /// model turn from the function calls.
    pub fn model_content(&self) -> Content {
        let parsed = self
            .first_candidate()
            .and_then(|c| c.get("content"))
            .and_then(|c| serde_json::from_value::<Content>(c.clone()).ok())
            .filter(|c| !c.parts.is_empty());

        parsed.unwrap_or_else(|| Content {
            role: Role::Model,
            parts: self
                .function_calls()
                .into_iter()
                .map(Part::function_call)
                .collect(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
