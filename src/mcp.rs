//! Transport-agnostic MCP (JSON-RPC 2.0) message handling.
//!
//! Both the HTTP endpoint and the stdio loop feed raw messages into
//! [`McpHandler`] and write back whatever it returns. Notifications
//! (messages without an `id`) produce no response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::tool::{self, HttpxTool, TOOL_NAME};
use crate::types::ScanRequest;

pub const SERVER_NAME: &str = "httpx-mcp-rs";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// JSON-RPC error codes.
pub mod code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

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
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct McpHandler {
    tool: HttpxTool,
}

impl McpHandler {
    pub fn new(tool: HttpxTool) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &HttpxTool {
        &self.tool
    }

    /// Handle one raw message. Unparseable input yields a parse error with a null id.
    pub async fn handle_bytes(&self, raw: &[u8]) -> Option<RpcResponse> {
        match serde_json::from_slice::<Value>(raw) {
            Ok(message) => self.handle_value(message).await,
            Err(e) => Some(RpcResponse::failure(
                Value::Null,
                code::PARSE_ERROR,
                format!("parse error: {e}"),
            )),
        }
    }

    pub async fn handle_value(&self, message: Value) -> Option<RpcResponse> {
        if !message.is_object() {
            return Some(RpcResponse::failure(
                Value::Null,
                code::INVALID_REQUEST,
                "message must be a JSON object",
            ));
        }
        let raw_id = message.get("id").cloned();
        let req: RpcRequest = match serde_json::from_value(message) {
            Ok(r) => r,
            Err(e) => {
                return Some(RpcResponse::failure(
                    raw_id.unwrap_or(Value::Null),
                    code::INVALID_REQUEST,
                    format!("invalid request: {e}"),
                ))
            }
        };

        let Some(id) = raw_id else {
            debug!(method = %req.method, "notification received");
            return None;
        };

        let outcome = match req.method.as_str() {
            "initialize" => Ok(initialize_result(&req.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [HttpxTool::definition()] })),
            "tools/call" => self.call_tool(req.params).await,
            other => Err((code::METHOD_NOT_FOUND, format!("method not found: {other}"))),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err((code, message)) => RpcResponse::failure(id, code, message),
        })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, (i64, String)> {
        let params: CallParams = serde_json::from_value(params)
            .map_err(|e| (code::INVALID_PARAMS, format!("invalid tools/call params: {e}")))?;
        if params.name != TOOL_NAME {
            return Err((code::INVALID_PARAMS, format!("tool {} not found", params.name)));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let req: ScanRequest = serde_json::from_value(arguments).map_err(|e| {
            (
                code::INVALID_PARAMS,
                format!("invalid arguments for tool {TOOL_NAME}: {e}"),
            )
        })?;

        match self.tool.call(&req).await {
            Ok(resp) => Ok(json!({
                "content": [{ "type": "text", "text": resp.text }],
            })),
            Err(ToolError::Validation(msg)) => Err((code::INVALID_PARAMS, msg)),
            Err(e) => {
                warn!(kind = e.kind(), "returning tool error to client");
                Ok(json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                    "structuredContent": { "error": tool::error_details(&e) },
                }))
            }
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessRunner;

    fn handler() -> McpHandler {
        McpHandler::new(HttpxTool::new(ProcessRunner::new("/nonexistent/httpx")))
    }

    #[tokio::test]
    async fn initialize_negotiates_version() {
        let resp = handler()
            .handle_value(json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": { "protocolVersion": "2024-11-05" }
            }))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);

        let resp = handler()
            .handle_value(json!({
                "jsonrpc": "2.0", "id": 2, "method": "initialize",
                "params": { "protocolVersion": "1999-01-01" }
            }))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["protocolVersion"], SUPPORTED_PROTOCOL_VERSIONS[0]);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let resp = handler()
            .handle_value(json!({ "jsonrpc": "2.0", "id": 5, "method": "ping" }))
            .await
            .unwrap();
        assert_eq!(resp.id, json!(5));
        assert_eq!(resp.result, Some(json!({})));
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let resp = handler()
            .handle_value(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn unknown_method() {
        let resp = handler()
            .handle_value(json!({ "jsonrpc": "2.0", "id": "a", "method": "resources/list" }))
            .await
            .unwrap();
        assert_eq!(resp.id, json!("a"));
        assert_eq!(resp.error.unwrap().code, code::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let resp = handler().handle_bytes(b"{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, code::PARSE_ERROR);

        let resp = handler().handle_bytes(b"[1,2]").await.unwrap();
        assert_eq!(resp.error.unwrap().code, code::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn empty_targets_is_invalid_params() {
        let resp = handler()
            .handle_value(json!({
                "jsonrpc": "2.0", "id": 7, "method": "tools/call",
                "params": { "name": "httpx", "arguments": { "targets": [] } }
            }))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, code::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let resp = handler()
            .handle_value(json!({
                "jsonrpc": "2.0", "id": 8, "method": "tools/call",
                "params": { "name": "nmap", "arguments": { "targets": ["a"] } }
            }))
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, code::INVALID_PARAMS);
        assert!(err.message.contains("nmap"));
    }
}
