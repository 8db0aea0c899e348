//! Shared types for the MCP client.
//!
//! JSON-RPC 2.0 message types and MCP protocol structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─── Protocol Constants ──────────────────────────────────────────────────────

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name announced during `initialize`.
pub const CLIENT_NAME: &str = "weather-assistant-backend";

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request. Missing params are sent as `{}`.
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params: params.unwrap_or_else(|| serde_json::json!({})),
        }
    }
}

/// JSON-RPC 2.0 response message (success or error).
///
/// Every field is optional: the server may emit notifications or responses
/// with non-integer ids, and those must still parse so they can be ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The numeric request id this message answers, if any.
    pub fn request_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(serde_json::Value::as_u64)
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    #[serde(default = "default_error_code")]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn default_error_code() -> i32 {
    error_codes::INTERNAL_ERROR
}

// ─── MCP Protocol Types ──────────────────────────────────────────────────────

/// A tool descriptor as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: serde_json::Value,
}

/// `tools/list` response payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<McpToolDefinition>,
}

/// MCP initialize response payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeResult {
    #[serde(default, alias = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub capabilities: serde_json::Value,
    #[serde(default, alias = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Server info returned in the initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Build the `initialize` request params.
pub fn initialize_params() -> serde_json::Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

// ─── Server Configuration ────────────────────────────────────────────────────

/// How to launch the tool server subprocess.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Label used in logs and error messages.
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_server_command")]
    pub command: String,
    #[serde(default = "default_server_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory for the server process.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            command: default_server_command(),
            args: default_server_args(),
            env: HashMap::new(),
            cwd: None,
        }
    }
}

fn default_server_name() -> String {
    "weather".to_string()
}

fn default_server_command() -> String {
    "python".to_string()
}

fn default_server_args() -> Vec<String> {
    vec!["mcp-server/server.py".to_string()]
}

// ─── Standard MCP Error Codes ────────────────────────────────────────────────

/// Well-known JSON-RPC error codes.
pub mod error_codes {
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_defaults_params_to_empty_object() {
        let req = JsonRpcRequest::new(1, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"tools/list\""));
        assert!(json.contains("\"params\":{}"));
    }

    #[test]
    fn test_json_rpc_request_with_params() {
        let params = serde_json::json!({"name": "get_weather", "arguments": {"city": "Ankara"}});
        let req = JsonRpcRequest::new(42, "tools/call", Some(params));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"id\":42"));
        assert!(json.contains("tools/call"));
        assert!(json.contains("Ankara"));
    }

    #[test]
    fn test_response_request_id() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        assert_eq!(resp.request_id(), Some(1));

        let notification: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#)
                .unwrap();
        assert_eq!(notification.request_id(), None);

        let string_id: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"abc","result":{}}"#).unwrap();
        assert_eq!(string_id.request_id(), None);
    }

    #[test]
    fn test_error_without_code_defaults_to_internal() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"id":2,"error":{"message":"Unknown tool"}}"#).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert_eq!(err.message, "Unknown tool");
    }

    #[test]
    fn test_tool_definition_reads_input_schema() {
        let json = r#"{
            "name": "get_weather",
            "description": "Current weather",
            "inputSchema": {"type": "object", "properties": {"city": {"type": "string"}}}
        }"#;
        let tool: McpToolDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "get_weather");
        assert_eq!(tool.input_schema["properties"]["city"]["type"], "string");
    }

    #[test]
    fn test_tool_definition_defaults() {
        let tool: McpToolDefinition = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert!(tool.description.is_empty());
        assert!(tool.input_schema.is_null());
    }

    #[test]
    fn test_initialize_params_shape() {
        let params = initialize_params();
        assert_eq!(params["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(params["clientInfo"]["name"], CLIENT_NAME);
        assert!(params["capabilities"].is_object());
    }

    #[test]
    fn test_server_config_defaults_from_yaml() {
        let config: ServerConfig = serde_yaml::from_str("command: python3").unwrap();
        assert_eq!(config.name, "weather");
        assert_eq!(config.command, "python3");
        assert_eq!(config.args, vec!["mcp-server/server.py"]);
        assert!(config.cwd.is_none());
    }
}
