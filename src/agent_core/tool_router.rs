//! ToolRouter: dispatches model tool calls to the tool server.
//!
//! The agent loop only sees the [`ToolProvider`] seam. `McpClient` is the
//! production implementation; tests supply scripted fakes.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::inference::types::{FunctionDeclaration, FunctionResponse};
use crate::mcp_client::errors::McpError;
use crate::mcp_client::types::McpToolDefinition;
use crate::mcp_client::McpClient;

// ─── ToolProvider ───────────────────────────────────────────────────────────

/// Something that can list and execute tools.
pub trait ToolProvider: Send + Sync {
    fn list_tools(&self) -> impl Future<Output = Result<Vec<McpToolDefinition>, McpError>> + Send;

    fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> impl Future<Output = Result<Value, McpError>> + Send;

    fn is_connected(&self) -> bool;
}

impl ToolProvider for McpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        McpClient::call_tool(self, name, arguments).await
    }

    fn is_connected(&self) -> bool {
        McpClient::is_connected(self)
    }
}

impl<T: ToolProvider> ToolProvider for Arc<T> {
    fn list_tools(&self) -> impl Future<Output = Result<Vec<McpToolDefinition>, McpError>> + Send {
        (**self).list_tools()
    }

    fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> impl Future<Output = Result<Value, McpError>> + Send {
        (**self).call_tool(name, arguments)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

// ─── Conversions ────────────────────────────────────────────────────────────

/// Convert a tool descriptor into a model function declaration.
pub fn to_declaration(tool: &McpToolDefinition) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.input_schema.clone(),
    }
}

/// Normalize model-supplied arguments into a JSON object.
///
/// - object: unchanged
/// - string: parsed as JSON, or `{query: <string>}` if unparsable
/// - `null`: `{}`
/// - anything else: `{value: <it>}`
pub fn normalize_arguments(args: Value) -> Value {
    match args {
        Value::Object(_) => args,
        Value::Null => Value::Object(Default::default()),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            Ok(Value::Null) => Value::Object(Default::default()),
            _ => serde_json::json!({ "query": s }),
        },
        other => serde_json::json!({ "value": other }),
    }
}

/// Build the `functionResponse` for a tool result.
///
/// The model requires an object here, so anything else is wrapped as
/// `{result: <value>}`.
pub fn to_function_response(name: &str, result: &Value) -> FunctionResponse {
    let response = if result.is_object() {
        result.clone()
    } else {
        serde_json::json!({ "result": result })
    };
    FunctionResponse {
        name: name.to_string(),
        response,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
