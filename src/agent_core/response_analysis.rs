//! Response analysis for the agent loop.
//!
//! Extracts the final answer from a model response. Response shapes vary, so
//! extraction runs an ordered list of strategies and falls back to a fixed
//! apology; the caller never sees an empty answer.

use serde_json::Value;

use crate::inference::ModelResponse;

/// Shown when no strategy finds any text.
pub const APOLOGY_TEXT: &str = "Üzgünüm, yanıt alınamadı. Lütfen tekrar deneyin.";

/// A single way of pulling text out of a response.
type TextStrategy = fn(&ModelResponse) -> Option<String>;

/// Strategies in priority order.
const TEXT_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("direct_text", direct_text),
    ("candidate_parts", candidate_text_parts),
];

/// Extract the final answer text. Never returns an empty string.
pub fn extract_final_text(response: &ModelResponse) -> String {
    for (name, strategy) in TEXT_STRATEGIES {
        if let Some(text) = strategy(response).filter(|t| !t.trim().is_empty()) {
            tracing::debug!(strategy = *name, len = text.len(), "extracted final text");
            return text;
        }
    }

    tracing::warn!("model response contained no text, using apology");
    APOLOGY_TEXT.to_string()
}

fn direct_text(response: &ModelResponse) -> Option<String> {
    response.text()
}

/// Text parts of the first candidate, joined with newlines.
///
/// Looks at `content.parts`, candidate-level `parts`, then `content.text`.
fn candidate_text_parts(response: &ModelResponse) -> Option<String> {
    let candidate = response.first_candidate()?;

    let texts: Vec<&str> = match candidate.get("content") {
        Some(content) => match content.get("parts").and_then(Value::as_array) {
            Some(parts) => parts.iter().filter_map(part_text).collect(),
            None => content.get("text").and_then(Value::as_str).into_iter().collect(),
        },
        None => candidate
            .get("parts")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().filter_map(part_text).collect())
            .unwrap_or_default(),
    };

    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn part_text(part: &Value) -> Option<&str> {
    part.get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
