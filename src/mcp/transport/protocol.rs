// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC envelope shared by both transports.
//!
//! Both the stream and the subprocess transport speak the same MCP tool
//! protocol: JSON-RPC 2.0 requests for `initialize`, `tools/list` and
//! `tools/call`. This module builds the request envelopes and decodes the
//! response envelopes so the transports only differ in how bytes move.

use serde_json::Value;

use super::super::error::McpError;
use super::super::types::{McpContent, McpToolInfo, McpToolResult};

/// MCP protocol version spoken by this client.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC method names.
pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_LIST_TOOLS: &str = "tools/list";
pub const METHOD_CALL_TOOL: &str = "tools/call";

/// Build a JSON-RPC request envelope.
pub fn request(id: u64, method: &str, params: Option<Value>) -> Value {
    let mut envelope = serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(params) = params {
        envelope["params"] = params;
    }
    envelope
}

/// Build a JSON-RPC notification (no id, no response expected).
pub fn notification(method: &str) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
    })
}

/// Parameters for the `initialize` handshake.
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "clientInfo": {
            "name": "toolmux",
            "version": crate::VERSION
        }
    })
}

/// Parameters for a `tools/call` request.
pub fn call_params(tool_name: &str, arguments: Value) -> Value {
    serde_json::json!({
        "name": tool_name,
        "arguments": arguments
    })
}

/// Extract the `result` object from a JSON-RPC response envelope.
///
/// A response carrying an `error` member becomes [`McpError::Protocol`];
/// a response with neither `result` nor `error` is malformed.
pub fn result_of(response: &Value) -> Result<&Value, McpError> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(|v| v.as_i64()).unwrap_or(-1) as i32;
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        return Err(McpError::protocol(code, message));
    }

    response.get("result").ok_or_else(|| {
        McpError::InvalidResponse("missing 'result' in response envelope".to_string())
    })
}

/// The response id, when present and numeric.
pub fn response_id(response: &Value) -> Option<u64> {
    response.get("id").and_then(|v| v.as_u64())
}

/// Parse the tool list out of a `tools/list` result object.
pub fn parse_tools(result: &Value) -> Vec<McpToolInfo> {
    result
        .get("tools")
        .and_then(|t| t.as_array())
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| {
                    let name = t.get("name")?.as_str()?.to_string();
                    Some(McpToolInfo {
                        name,
                        description: t
                            .get("description")
                            .and_then(|d| d.as_str())
                            .map(|s| s.to_string()),
                        input_schema: t
                            .get("inputSchema")
                            .cloned()
                            .unwrap_or(serde_json::json!({})),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a `tools/call` result object into an [`McpToolResult`].
pub fn parse_call_result(result: &Value) -> McpToolResult {
    let is_error = result
        .get("isError")
        .and_then(|e| e.as_bool())
        .unwrap_or(false);

    let content = result
        .get("content")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let parsed_content: Vec<McpContent> = content
        .into_iter()
        .filter_map(|c| {
            let content_type = c.get("type")?.as_str()?;
            match content_type {
                "text" => Some(McpContent::Text {
                    text: c.get("text")?.as_str()?.to_string(),
                }),
                "image" => Some(McpContent::Image {
                    data: c.get("data")?.as_str()?.to_string(),
                    mime_type: c.get("mimeType")?.as_str()?.to_string(),
                }),
                "resource" => {
                    let resource = c.get("resource")?;
                    Some(McpContent::Resource {
                        uri: resource.get("uri")?.as_str()?.to_string(),
                        mime_type: resource
                            .get("mimeType")
                            .and_then(|m| m.as_str())
                            .map(|s| s.to_string()),
                        text: resource
                            .get("text")
                            .and_then(|t| t.as_str())
                            .map(|s| s.to_string()),
                    })
                }
                _ => None,
            }
        })
        .collect();

    McpToolResult {
        success: !is_error,
        content: parsed_content,
        is_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope() {
        let req = request(7, METHOD_LIST_TOOLS, None);
        assert_eq!(req["jsonrpc"], "2.0");
        assert_eq!(req["id"], 7);
        assert_eq!(req["method"], "tools/list");
        assert!(req.get("params").is_none());

        let req = request(8, METHOD_CALL_TOOL, Some(call_params("ping", serde_json::json!({}))));
        assert_eq!(req["params"]["name"], "ping");
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = notification(METHOD_INITIALIZED);
        assert!(note.get("id").is_none());
        assert_eq!(note["method"], "notifications/initialized");
    }

    #[test]
    fn test_result_of_success() {
        let response = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "tools": [] }
        });
        let result = result_of(&response).unwrap();
        assert!(result.get("tools").is_some());
    }

    #[test]
    fn test_result_of_error() {
        let response = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        });
        let err = result_of(&response).unwrap_err();
        assert!(matches!(err, McpError::Protocol { code: -32601, .. }));
    }

    #[test]
    fn test_result_of_malformed() {
        let response = serde_json::json!({ "jsonrpc": "2.0", "id": 1 });
        assert!(matches!(
            result_of(&response),
            Err(McpError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_tools() {
        let result = serde_json::json!({
            "tools": [
                {
                    "name": "ping",
                    "description": "Ping the host",
                    "inputSchema": { "type": "object", "properties": { "host": { "type": "string" } } }
                },
                { "name": "bare" },
                { "description": "nameless, skipped" }
            ]
        });

        let tools = parse_tools(&result);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "ping");
        assert_eq!(tools[0].description.as_deref(), Some("Ping the host"));
        assert_eq!(tools[1].name, "bare");
        assert!(tools[1].description.is_none());
    }

    #[test]
    fn test_parse_tools_empty() {
        assert!(parse_tools(&serde_json::json!({})).is_empty());
        assert!(parse_tools(&serde_json::json!({"tools": []})).is_empty());
    }

    #[test]
    fn test_parse_call_result_text() {
        let result = serde_json::json!({
            "content": [{ "type": "text", "text": "pong" }]
        });
        let parsed = parse_call_result(&result);
        assert!(parsed.success);
        assert_eq!(parsed.as_text(), "pong");
    }

    #[test]
    fn test_parse_call_result_error_flag() {
        let result = serde_json::json!({
            "isError": true,
            "content": [{ "type": "text", "text": "boom" }]
        });
        let parsed = parse_call_result(&result);
        assert!(!parsed.success);
        assert!(parsed.is_error);
        assert_eq!(parsed.as_text(), "boom");
    }

    #[test]
    fn test_response_id() {
        let response = serde_json::json!({ "jsonrpc": "2.0", "id": 42, "result": {} });
        assert_eq!(response_id(&response), Some(42));

        let note = serde_json::json!({ "jsonrpc": "2.0", "method": "notifications/progress" });
        assert_eq!(response_id(&note), None);
    }
}
