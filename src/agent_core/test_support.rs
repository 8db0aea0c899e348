//! Scripted fakes for the model and tool seams, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::inference::{GenerateRequest, InferenceError, ModelCapability, ModelResponse};
use crate::mcp_client::{McpError, McpToolDefinition};

use super::tool_router::ToolProvider;

// ─── FakeModel ──────────────────────────────────────────────────────────────

/// Replays scripted responses; repeats `fallback` once the script runs out.
pub struct FakeModel {
    script: Mutex<VecDeque<Result<ModelResponse, InferenceError>>>,
    fallback: ModelResponse,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeModel {
    pub fn new(script: Vec<Result<ModelResponse, InferenceError>>) -> Self {
        Self::with_fallback(script, text_response("fallback"))
    }

    pub fn with_fallback(
        script: Vec<Result<ModelResponse, InferenceError>>,
        fallback: ModelResponse,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ModelCapability for FakeModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

// ─── FakeTools ──────────────────────────────────────────────────────────────

/// In-memory tool provider with fixed results per tool name.
#[derive(Default)]
pub struct FakeTools {
    pub catalog: Vec<McpToolDefinition>,
    pub results: HashMap<String, Value>,
    /// Every call fails with a timeout.
    pub fail_calls: bool,
    pub disconnected: bool,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeTools {
    /// The weather tool set with canned Ankara-style results.
    pub fn weather() -> Self {
        let mut results = HashMap::new();
        results.insert("get_weather".to_string(), json!({"temperature": 10}));
        results.insert(
            "get_weather_forecast".to_string(),
            json!({"days": [{"date": "2026-10-18", "max": 14, "min": 6}]}),
        );
        Self {
            catalog: vec![
                McpToolDefinition {
                    name: "get_weather".into(),
                    description: "Current weather for a city".into(),
                    input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
                },
                McpToolDefinition {
                    name: "get_weather_forecast".into(),
                    description: "Forecast for a city".into(),
                    input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
                },
            ],
            results,
            ..Self::default()
        }
    }

    /// Every call received so far, as `(name, arguments)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolProvider for FakeTools {
    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        Ok(self.catalog.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        if self.disconnected {
            return Err(McpError::NotConnected {
                name: "fake".into(),
            });
        }
        if self.fail_calls {
            return Err(McpError::Timeout {
                method: "tools/call".into(),
                timeout_ms: 30_000,
            });
        }
        Ok(self.results.get(name).cloned().unwrap_or(Value::Null))
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

// ─── Response builders ──────────────────────────────────────────────────────

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse::from_value(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    }))
}

pub fn call_response(name: &str, args: Value) -> ModelResponse {
    ModelResponse::from_value(json!({
        "candidates": [{"content": {
            "role": "model",
            "parts": [{"functionCall": {"name": name, "args": args}}]
        }}]
    }))
}

pub fn rate_limited() -> InferenceError {
    InferenceError::RateLimited {
        body: "RESOURCE_EXHAUSTED".into(),
    }
}
