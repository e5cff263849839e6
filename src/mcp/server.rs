//! MCP server implementation.
//!
//! Reads JSON-RPC messages from a transport and dispatches `tools/*`
//! requests to a [`ToolProvider`]. Requests are handled one at a time.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::mcp::error::McpError;
use crate::mcp::transport::McpTransport;
use crate::mcp::types::*;

/// Source of the tools a server exposes.
///
/// `call` never fails at the protocol level: tool failures are reported
/// in-band as an error-flagged [`CallToolResult`].
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// The fixed tool catalog.
    fn tools(&self) -> Vec<ToolInfo>;

    /// Invoke a tool by name.
    async fn call(&self, name: &str, arguments: Value) -> CallToolResult;
}

/// MCP server bridging a [`ToolProvider`] to an MCP client.
pub struct McpServer<P> {
    provider: P,
    server_name: String,
    server_version: String,
    initialized: bool,
}

impl<P: ToolProvider> McpServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Run the server loop until the transport closes.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP server starting");

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %line, "Received message");

            if let Some(reply) = self.handle_message(&line).await {
                let json = serde_json::to_string(&reply)?;
                tracing::debug!(response = %json, "Sending response");
                transport.send(&json).await?;
            }
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw line. Returns `None` when nothing needs answering
    /// (a notification, or a batch made only of notifications).
    pub async fn handle_message(&mut self, line: &str) -> Option<RpcReply> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON");
                return Some(RpcReply::Single(JsonRpcResponse::error(
                    None,
                    McpError::JsonParse(e).to_rpc_error(),
                )));
            }
        };

        match raw {
            Value::Array(items) if items.is_empty() => Some(RpcReply::Single(invalid_request(
                None,
                "empty batch".to_string(),
            ))),
            Value::Array(items) => {
                tracing::debug!(size = items.len(), "Handling batch");
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(response) = self.handle_value(item).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then_some(RpcReply::Batch(responses))
            }
            other => self.handle_value(other).await.map(RpcReply::Single),
        }
    }

    /// Handle one message object, telling requests (with "id") from
    /// notifications (without).
    async fn handle_value(&mut self, raw: Value) -> Option<JsonRpcResponse> {
        if !raw.is_object() {
            tracing::warn!("Message is not a JSON object");
            return Some(invalid_request(None, "expected a JSON-RPC object".to_string()));
        }

        if raw.get("id").is_none() {
            match serde_json::from_value::<JsonRpcNotification>(raw) {
                Ok(notif) => self.handle_notification(&notif),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed notification"),
            }
            return None;
        }

        let id = raw.get("id").cloned().and_then(|v| serde_json::from_value(v).ok());
        match serde_json::from_value::<JsonRpcRequest>(raw) {
            Ok(request) => Some(self.handle_request(&request).await),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                Some(invalid_request(id, e.to_string()))
            }
        }
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(&request.params).await,
            method => {
                tracing::warn!(method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(Some(id), err.to_rpc_error()),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("Client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "Unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&mut self, params: &Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p.clone())
                .map_err(|e| McpError::InvalidParams(e.to_string()))?,
            None => InitializeParams::default(),
        };
        let protocol_version = negotiate_protocol_version(params.protocol_version.as_deref());

        tracing::info!(
            client = ?params.client_info.as_ref().map(|c| c.name.as_str()),
            protocol_version = %protocol_version,
            "Handling initialize"
        );
        if self.initialized {
            tracing::debug!("Client re-initialized the session");
        }
        self.initialized = true;

        to_result(InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        })
    }

    fn handle_list_tools(&self) -> Result<Value, McpError> {
        tracing::debug!("Handling tools/list");
        to_result(ListToolsResult {
            tools: self.provider.tools(),
        })
    }

    async fn handle_call_tool(&self, params: &Option<Value>) -> Result<Value, McpError> {
        let params = params
            .as_ref()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        tracing::debug!(tool = %call.name, "Handling tools/call");
        let result = self.provider.call(&call.name, call.arguments).await;
        if result.is_error {
            tracing::debug!(tool = %call.name, "Tool call returned an error result");
        }
        to_result(result)
    }
}

fn invalid_request(id: Option<RpcId>, reason: String) -> JsonRpcResponse {
    JsonRpcResponse::error(
        id,
        JsonRpcError {
            code: error_codes::INVALID_REQUEST,
            message: format!("Invalid request: {}", reason),
            data: None,
        },
    )
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}
