//! MCP (JSON-RPC 2.0) message types and the request dispatcher.
//!
//! Only the server side of the tool surface is implemented: `initialize`,
//! `ping`, `tools/list` and `tools/call`. Notifications are accepted and
//! produce no response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::invoker::CommandInvoker;
use crate::runner::{ProcessRunner, TokioProcessRunner};
use crate::types::ScanRequest;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "arjun-mcp";
pub const TOOL_NAME: &str = "do_arjun";

/// A JSON-RPC 2.0 request or notification (no `id` member).
///
/// `"id": null` is a request with a null id, not a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn present_id<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl RpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// -32700: body is not JSON
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    /// -32600: JSON, but not a request object
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    /// -32601
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    /// -32602
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }
}

/// Tool descriptor returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result payload of `tools/call`. Tool failures are reported here with
/// `is_error` set rather than as JSON-RPC errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl CallToolResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".into(),
                text,
            }],
            is_error: false,
            meta: None,
        }
    }

    pub fn failure(err: &ScanError) -> Self {
        let mut meta = json!({ "errorKind": err.kind() });
        if let Some(code) = err.exit_code() {
            meta["exitCode"] = json!(code);
        }
        Self {
            content: vec![TextContent {
                kind: "text".into(),
                text: err.to_string(),
            }],
            is_error: true,
            meta: Some(meta),
        }
    }
}

/// Descriptor for the single tool this server exposes.
pub fn arjun_tool() -> Tool {
    Tool {
        name: TOOL_NAME.into(),
        description: "Run Arjun to discover hidden HTTP parameters. \
                      Either 'url' or 'textFile' must be provided."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Target URL to scan for hidden parameters (required if textFile not provided)."
                },
                "textFile": {
                    "type": "string",
                    "description": "Path to file containing multiple URLs (optional, exclusive with url)."
                },
                "wordlist": {
                    "type": "string",
                    "description": "Path to custom wordlist file."
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method to use (GET, POST, JSON, HEADERS)."
                },
                "rateLimit": {
                    "type": ["integer", "null"],
                    "description": "Maximum requests per second."
                },
                "chunkSize": {
                    "type": ["integer", "null"],
                    "description": "Number of parameters to send at once."
                }
            }
        }),
    }
}

/// Dispatches MCP requests to a shared [`CommandInvoker`].
///
/// Each `tools/call` gets a child of `shutdown`, so stopping the server
/// kills every scan still in flight.
pub struct McpHandler<R = TokioProcessRunner> {
    invoker: Arc<CommandInvoker<R>>,
    shutdown: CancellationToken,
}

impl<R> Clone for McpHandler<R> {
    fn clone(&self) -> Self {
        Self {
            invoker: self.invoker.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<R: ProcessRunner> McpHandler<R> {
    pub fn new(invoker: CommandInvoker<R>, shutdown: CancellationToken) -> Self {
        Self {
            invoker: Arc::new(invoker),
            shutdown,
        }
    }

    /// Handle a raw HTTP body. `None` means nothing should be sent back.
    pub async fn handle_bytes(&self, body: &[u8]) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                return Some(RpcResponse::err(
                    Value::Null,
                    RpcError::parse_error(format!("Parse error: {e}")),
                ))
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<RpcRequest>(value) {
            Ok(req) => self.handle(req).await,
            Err(e) => Some(RpcResponse::err(
                id,
                RpcError::invalid_request(format!("Invalid request: {e}")),
            )),
        }
    }

    pub async fn handle(&self, req: RpcRequest) -> Option<RpcResponse> {
        debug!(method = %req.method, id = ?req.id, "rpc");

        let Some(id) = req.id.clone() else {
            // notifications/initialized, notifications/cancelled, ...
            return None;
        };
        if req.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::err(
                id,
                RpcError::invalid_request(format!("unsupported jsonrpc version '{}'", req.jsonrpc)),
            ));
        }

        let outcome = match req.method.as_str() {
            "initialize" => Ok(initialize_result(req.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [arjun_tool()] })),
            "tools/call" => self.call_tool(req.params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::ok(id, result),
            Err(error) => RpcResponse::err(id, error),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
        let call: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| RpcError::invalid_params(format!("invalid tools/call params: {e}")))?;
        if call.name != TOOL_NAME {
            return Err(RpcError::invalid_params(format!("Unknown tool: {}", call.name)));
        }

        let args = match call.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let req: ScanRequest = serde_json::from_value(args)
            .map_err(|e| RpcError::invalid_params(format!("invalid arguments for {TOOL_NAME}: {e}")))?;

        let cancel = self.shutdown.child_token();
        let result = match self.invoker.invoke_with_cancel(&req, &cancel).await {
            Ok(output) => CallToolResult::text(output),
            Err(e) => {
                warn!(kind = e.kind(), "{TOOL_NAME} failed: {e}");
                CallToolResult::failure(&e)
            }
        };
        serde_json::to_value(result)
            .map_err(|e| RpcError::new(-32603, format!("failed to encode result: {e}")))
    }
}

fn initialize_result(params: Option<&Value>) -> Value {
    let version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
    })
}
