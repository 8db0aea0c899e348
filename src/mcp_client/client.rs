//! MCP Client: high-level interface for the weather tool server.
//!
//! Combines the stdio transport with the correlation table and exposes the
//! three operations the assistant needs: handshake, tool listing, and tool
//! calls. Any number of calls may be outstanding at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::correlation::CorrelationTable;
use super::errors::McpError;
use super::transport::{InboundMessages, StdioTransport};
use super::types::{
    initialize_params, InitializeResult, JsonRpcRequest, McpToolDefinition, ServerConfig,
    ToolsListResult,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default per-request timeout (ms).
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

// ─── McpClient ───────────────────────────────────────────────────────────────

/// Protocol client bound to a single tool server process.
pub struct McpClient {
    server_name: String,
    transport: StdioTransport,
    table: Arc<CorrelationTable>,
    /// Set once the `initialize` handshake has succeeded.
    initialized: AtomicBool,
    call_timeout: Duration,
}

impl McpClient {
    /// Wrap a transport and start routing its inbound messages.
    ///
    /// The client is not usable for tool calls until [`handshake`] succeeds.
    ///
    /// [`handshake`]: McpClient::handshake
    pub fn new(transport: StdioTransport, inbound: InboundMessages) -> Self {
        let server_name = transport.server_name().to_string();
        let table = Arc::new(CorrelationTable::new(&server_name));

        spawn_dispatcher(server_name.clone(), inbound, table.clone());

        Self {
            server_name,
            transport,
            table,
            initialized: AtomicBool::new(false),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }

    /// Spawn the configured server and complete the handshake.
    ///
    /// The handshake waits up to `init_timeout`; later calls use
    /// `call_timeout`. Any failure here is fatal to service startup: the
    /// process is stopped and the error returned.
    pub async fn connect(
        config: &ServerConfig,
        init_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, McpError> {
        let (transport, inbound) = StdioTransport::start(config)?;
        let mut client = Self::new(transport, inbound);
        client.set_call_timeout(init_timeout);

        let handshake = client.handshake().await;
        client.set_call_timeout(call_timeout);

        match handshake {
            Ok(info) => {
                tracing::info!(
                    server = %client.server_name,
                    protocol = info.protocol_version.as_deref().unwrap_or("unknown"),
                    server_info = info
                        .server_info
                        .as_ref()
                        .and_then(|s| s.name.as_deref())
                        .unwrap_or("unknown"),
                    server_version = info
                        .server_info
                        .as_ref()
                        .and_then(|s| s.version.as_deref())
                        .unwrap_or("unknown"),
                    "tool server connected"
                );
                Ok(client)
            }
            Err(e) => {
                client.disconnect().await;
                Err(McpError::InitFailed {
                    name: config.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Set the per-request timeout.
    pub fn set_call_timeout(&mut self, timeout: Duration) {
        self.call_timeout = timeout;
    }

    // ─── Core Request Path ───────────────────────────────────────────────

    /// Send a request and wait for its correlated response.
    ///
    /// Resolves with the response's `result` (or `null` if absent); rejects
    /// with `ServerError` if the response carries `error`, or `Timeout` if
    /// the write and the answer together do not finish before the deadline.
    /// The pending entry is released on every exit, including when the
    /// caller drops this future.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let (id, rx) = self.table.register();
        let _pending = self.table.guard(id);
        let request = JsonRpcRequest::new(id, method, params);

        let payload = serde_json::to_string(&request).map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to serialize request: {e}"),
        })?;

        let exchange = async {
            self.transport.send(&payload).await?;
            tracing::debug!(server = %self.server_name, id, method, "request sent");

            match rx.await {
                Ok(outcome) => outcome,
                // Waiter dropped without an answer: the client was disconnected.
                Err(_) => Err(McpError::NotConnected {
                    name: self.server_name.clone(),
                }),
            }
        };

        match tokio::time::timeout(self.call_timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    server = %self.server_name,
                    id,
                    method,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "request timed out"
                );
                Err(McpError::Timeout {
                    method: method.to_string(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                })
            }
        }
    }

    // ─── Semantic Operations ─────────────────────────────────────────────

    /// Perform the MCP `initialize` handshake.
    pub async fn handshake(&self) -> Result<InitializeResult, McpError> {
        let result = self.call("initialize", Some(initialize_params())).await?;

        let info = if result.is_null() {
            InitializeResult::default()
        } else {
            serde_json::from_value(result).map_err(|e| McpError::InitFailed {
                name: self.server_name.clone(),
                reason: format!("failed to parse initialize response: {e}"),
            })?
        };

        self.initialized.store(true, Ordering::SeqCst);
        Ok(info)
    }

    /// List the tools the server exposes. An absent list is an empty catalog.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        let result = self.call("tools/list", None).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }

        let listed: ToolsListResult =
            serde_json::from_value(result).map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("malformed tools/list result: {e}"),
            })?;
        Ok(listed.tools)
    }

    /// Call a tool and unwrap its result envelope.
    ///
    /// See [`normalize_tool_result`] for how the payload is extracted.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.call("tools/call", Some(params)).await?;
        Ok(normalize_tool_result(result))
    }

    // ─── Status ──────────────────────────────────────────────────────────

    /// True iff the handshake succeeded and the process is still alive.
    pub fn is_connected(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && self.transport.is_connected()
    }

    /// Stop the server and drop every pending request without answering it.
    pub async fn disconnect(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.transport.stop().await;
        let dropped = self.table.clear();
        if dropped > 0 {
            tracing::info!(server = %self.server_name, dropped, "cleared pending requests on disconnect");
        }
    }

    /// Number of requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.table.len()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Route inbound messages into the correlation table until the stream ends.
///
/// When stdout closes nothing can answer the remaining waiters, so they are
/// dropped and their callers see `NotConnected` right away.
fn spawn_dispatcher(server: String, mut inbound: InboundMessages, table: Arc<CorrelationTable>) {
    tokio::spawn(async move {
        while let Some(message) = inbound.recv().await {
            table.deliver(message);
        }
        let dropped = table.clear();
        tracing::info!(server = %server, dropped, "tool server stream ended");
    });
}

// ─── Result Normalization ────────────────────────────────────────────────────

/// Unwrap a `tools/call` result envelope.
///
/// - `content[0]` is `{type: "text", text}`: the text parsed as JSON, or
///   `{text: <raw>}` when it is not valid JSON.
/// - anything else: the raw result, unchanged.
pub fn normalize_tool_result(result: Value) -> Value {
    let first_text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str);

    match first_text {
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::json!({ "text": text })),
        None => result,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
