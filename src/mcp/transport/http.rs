// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Stream transport over HTTP.
//!
//! POSTs JSON-RPC envelopes to the configured endpoint, attaching every
//! configured header (bearer tokens and friends) to every request. Endpoints
//! may answer with a plain JSON body or an SSE-framed stream; both are
//! accepted, and for SSE bodies the last `data:` frame carries the response
//! envelope. A session id issued during `initialize` is echoed back on
//! subsequent requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

#[cfg(feature = "telemetry")]
use tracing::debug;

use super::super::config::ServerConfig;
use super::super::error::McpError;
use super::super::types::{McpToolInfo, McpToolResult};
use super::protocol;

/// Header carrying the streamable-HTTP session id.
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Transport client speaking JSON-RPC over HTTP.
pub struct HttpTransport {
    /// Server name, for diagnostics.
    server_name: String,

    /// Endpoint URL.
    url: String,

    /// Headers attached to every request (already env-expanded).
    headers: HashMap<String, String>,

    /// Underlying HTTP client.
    client: Client,

    /// Bound on the initialization handshake.
    startup_timeout: Duration,

    /// Bound on each tool call.
    tool_timeout: Duration,

    /// Request ID counter.
    request_id: AtomicU64,

    /// Session id issued by the server during initialization.
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    /// Create a transport from a stream-shaped server config.
    pub fn from_config(
        server_name: impl Into<String>,
        config: &ServerConfig,
    ) -> Result<Self, McpError> {
        let url = config.url.clone().ok_or_else(|| {
            McpError::Config("stream transport requires a 'url' field".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.tool_timeout_sec))
            .build()
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(Self {
            server_name: server_name.into(),
            url,
            headers: config.expanded_headers(),
            client,
            startup_timeout: Duration::from_secs(config.startup_timeout_sec),
            tool_timeout: Duration::from_secs(config.tool_timeout_sec),
            request_id: AtomicU64::new(0),
            session_id: Mutex::new(None),
        })
    }

    /// Get the server name.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run the `initialize` handshake against the endpoint.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let id = self.next_request_id();
        let request = protocol::request(
            id,
            protocol::METHOD_INITIALIZE,
            Some(protocol::initialize_params()),
        );

        let response = self.post(&request, self.startup_timeout, true).await?;
        protocol::result_of(&response)?;

        #[cfg(feature = "telemetry")]
        debug!(server = %self.server_name, url = %self.url, "http transport initialized");

        // Servers may ignore the notification; a transport-level failure
        // here is still a handshake failure.
        let note = protocol::notification(protocol::METHOD_INITIALIZED);
        self.post_notification(&note).await?;

        Ok(())
    }

    /// List the tools advertised by the endpoint.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let id = self.next_request_id();
        let request = protocol::request(id, protocol::METHOD_LIST_TOOLS, None);

        let response = self.post(&request, self.tool_timeout, false).await?;
        let result = protocol::result_of(&response)?;
        Ok(protocol::parse_tools(result))
    }

    /// Call a tool and return its (possibly failed) result.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<McpToolResult, McpError> {
        let id = self.next_request_id();
        let request = protocol::request(
            id,
            protocol::METHOD_CALL_TOOL,
            Some(protocol::call_params(tool_name, arguments)),
        );

        let timeout_secs = self.tool_timeout.as_secs();
        let response = self
            .post(&request, self.tool_timeout, false)
            .await
            .map_err(|e| match e {
                McpError::ConnectionTimeout { .. } => McpError::ToolCallTimeout {
                    tool: tool_name.to_string(),
                    timeout_secs,
                },
                other => other,
            })?;

        let result = protocol::result_of(&response)?;
        Ok(protocol::parse_call_result(result))
    }

    /// Nothing to tear down; the connection pool drops with the client.
    pub async fn shutdown(&self) {}

    /// POST one envelope and decode the response envelope.
    async fn post(
        &self,
        body: &Value,
        timeout: Duration,
        capture_session: bool,
    ) -> Result<Value, McpError> {
        let response = self.send(body, timeout).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "HTTP {status} from {}",
                self.url
            )));
        }

        if capture_session {
            if let Some(session) = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
            {
                *self.session_id.lock().unwrap() = Some(session.to_string());
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let text = response
            .text()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        decode_body(&content_type, &text)
    }

    /// POST a notification; only the status code matters.
    async fn post_notification(&self, body: &Value) -> Result<(), McpError> {
        let response = self.send(body, self.tool_timeout).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "HTTP {status} from {}",
                self.url
            )));
        }
        Ok(())
    }

    async fn send(&self, body: &Value, timeout: Duration) -> Result<reqwest::Response, McpError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let session = self.session_id.lock().unwrap().clone();
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        let timeout_secs = timeout.as_secs();
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::ConnectionTimeout {
                    server: self.server_name.clone(),
                    timeout_secs,
                }
            } else {
                McpError::connection_failed(&self.server_name, e.to_string())
            }
        })
    }
}

/// Decode a response body into a JSON-RPC envelope.
///
/// SSE bodies carry the envelope in `data:` frames; the last frame wins.
/// Everything else is parsed as plain JSON.
fn decode_body(content_type: &str, text: &str) -> Result<Value, McpError> {
    if content_type.starts_with("text/event-stream") {
        let data = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .last()
            .ok_or_else(|| {
                McpError::InvalidResponse("event stream carried no data frame".to_string())
            })?;
        return serde_json::from_str(data)
            .map_err(|e| McpError::InvalidResponse(format!("malformed data frame: {e}")));
    }

    serde_json::from_str(text)
        .map_err(|e| McpError::InvalidResponse(format!("malformed response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_url() {
        let config = ServerConfig::stdio("cat");
        let result = HttpTransport::from_config("test", &config);
        assert!(matches!(result, Err(McpError::Config(_))));
    }

    #[test]
    fn test_request_ids_increment() {
        let config = ServerConfig::http("http://localhost:1/rpc");
        let transport = HttpTransport::from_config("test", &config).unwrap();
        assert_eq!(transport.next_request_id(), 1);
        assert_eq!(transport.next_request_id(), 2);
    }

    #[test]
    fn test_decode_plain_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        let value = decode_body("application/json", body).unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn test_decode_sse_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{\"tools\":[]}}\n\n";
        let value = decode_body("text/event-stream", body).unwrap();
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn test_decode_sse_body_last_frame_wins() {
        let body = "data: {\"id\":1}\n\ndata: {\"id\":2}\n\n";
        let value = decode_body("text/event-stream; charset=utf-8", body).unwrap();
        assert_eq!(value["id"], 2);
    }

    #[test]
    fn test_decode_sse_body_without_data() {
        let body = "event: ping\n\n";
        assert!(matches!(
            decode_body("text/event-stream", body),
            Err(McpError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_decode_malformed_body() {
        assert!(matches!(
            decode_body("application/json", "not json"),
            Err(McpError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure_not_panic() {
        // Port 1 is essentially never listening.
        let config = ServerConfig::http("http://127.0.0.1:1/rpc").with_timeouts(2, 2);
        let transport = HttpTransport::from_config("refused", &config).unwrap();
        let result = transport.initialize().await;
        assert!(matches!(
            result,
            Err(McpError::ConnectionFailed { .. }) | Err(McpError::ConnectionTimeout { .. })
        ));
    }
}
