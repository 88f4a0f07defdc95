// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests of the dispatch layer against real transports.
//!
//! The subprocess transport is exercised with a small `/bin/sh` script that
//! speaks newline-delimited JSON-RPC on stdio; the stream transport with a
//! minimal HTTP endpoint on a loopback socket. Unix only, like the rest of
//! the test suite.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use toolmux::dispatch::UnifiedDispatcher;
use toolmux::error::ToolError;
use toolmux::mcp::{McpConfig, McpDispatcher, ServerConfig, ServerStatus};
use toolmux::tools::{ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};
use toolmux::types::{ToolDefinition, ToolSource};

/// Write an executable stdio stub that advertises one tool and answers
/// every call with a fixed text payload.
fn write_stdio_stub(dir: &Path, tool_name: &str, reply: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  [ -n "$id" ] || continue
  case "$line" in
    *'"initialize"'*)
      printf '{{"jsonrpc":"2.0","id":%s,"result":{{"protocolVersion":"2024-11-05","capabilities":{{"tools":{{}}}},"serverInfo":{{"name":"stub","version":"0.1.0"}}}}}}\n' "$id"
      ;;
    *'"tools/list"'*)
      printf '{{"jsonrpc":"2.0","id":%s,"result":{{"tools":[{{"name":"{tool_name}","description":"Stub {tool_name}","inputSchema":{{"type":"object"}}}}]}}}}\n' "$id"
      ;;
    *'"tools/call"'*)
      printf '{{"jsonrpc":"2.0","id":%s,"result":{{"content":[{{"type":"text","text":"{reply}"}}]}}}}\n' "$id"
      ;;
  esac
done
"#
    );

    let path = dir.join(format!("stub-{tool_name}.sh"));
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Spawn a loopback HTTP endpoint that advertises one tool and answers
/// every call with a fixed text payload. Returns the endpoint URL.
async fn spawn_http_stub(tool_name: &'static str, reply: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };

            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.split();
                let mut reader = BufReader::new(read_half);

                loop {
                    // Request line
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }

                    // Headers
                    let mut content_length = 0usize;
                    loop {
                        let mut header = String::new();
                        match reader.read_line(&mut header).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        let header = header.trim();
                        if header.is_empty() {
                            break;
                        }
                        if let Some(value) =
                            header.to_ascii_lowercase().strip_prefix("content-length:")
                        {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }

                    let mut body = vec![0u8; content_length];
                    if content_length > 0 && reader.read_exact(&mut body).await.is_err() {
                        return;
                    }

                    let request: serde_json::Value =
                        serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
                    let method = request["method"].as_str().unwrap_or("");
                    let id = request["id"].clone();

                    let reply_body = match method {
                        "initialize" => Some(json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": {
                                "protocolVersion": "2024-11-05",
                                "capabilities": { "tools": {} },
                                "serverInfo": { "name": "http-stub", "version": "0.1.0" }
                            }
                        })),
                        "tools/list" => Some(json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": {
                                "tools": [{
                                    "name": tool_name,
                                    "description": format!("Stub {tool_name}"),
                                    "inputSchema": { "type": "object" }
                                }]
                            }
                        })),
                        "tools/call" => Some(json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": {
                                "content": [{ "type": "text", "text": reply }]
                            }
                        })),
                        // Notifications get an empty accepted response.
                        _ => None,
                    };

                    let (status, payload) = match reply_body {
                        Some(value) => ("200 OK", value.to_string()),
                        None => ("202 Accepted", String::new()),
                    };

                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{payload}",
                        payload.len()
                    );
                    if write_half.write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    format!("http://{addr}/rpc")
}

struct StaticTool {
    name: String,
}

#[async_trait]
impl ToolHandler for StaticTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, "A built-in test tool")
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::success("built-in result"))
    }
}

fn local_registry(names: &[&str]) -> ToolRegistry {
    let mut builder = ToolRegistryBuilder::new();
    for name in names {
        builder.register(StaticTool {
            name: (*name).to_string(),
        });
    }
    builder.build()
}

#[tokio::test]
async fn two_servers_aggregate_and_route_by_transport() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_stdio_stub(dir.path(), "echo", "echoed");
    let url = spawn_http_stub("ping", "pong").await;

    let mut config = McpConfig::new();
    config.add_server("web", ServerConfig::http(url.as_str()).with_timeouts(10, 10));
    config.add_server(
        "proc",
        ServerConfig::stdio(script.display().to_string()).with_timeouts(10, 10),
    );

    let remote = McpDispatcher::from_config(&config).unwrap();
    let dispatcher = UnifiedDispatcher::new(local_registry(&["read_file"]), remote);
    dispatcher.initialize().await;

    let names: HashSet<String> = dispatcher
        .expose_descs()
        .await
        .into_iter()
        .map(|d| d.name)
        .collect();
    let expected: HashSet<String> = ["read_file", "ping", "echo"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);

    // "ping" must route to the stream client, never the subprocess one.
    let response = dispatcher.call("ping", json!({})).await;
    assert!(response.success, "ping failed: {:?}", response.error);
    assert_eq!(response.content, "pong");
    assert_eq!(response.source, ToolSource::Server("web".to_string()));

    let response = dispatcher.call("echo", json!({})).await;
    assert!(response.success, "echo failed: {:?}", response.error);
    assert_eq!(response.content, "echoed");
    assert_eq!(response.source, ToolSource::Server("proc".to_string()));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn subprocess_exiting_nonzero_is_marked_failed_not_hung() {
    let mut config = McpConfig::new();
    config.add_server(
        "crash",
        ServerConfig::stdio("sh")
            .with_args(["-c", "exit 3"])
            .with_timeouts(10, 10),
    );

    let dispatcher = McpDispatcher::from_config(&config).unwrap();

    let started = std::time::Instant::now();
    dispatcher.initialize().await;
    assert!(
        started.elapsed() < std::time::Duration::from_secs(10),
        "initialization joined within the timeout window"
    );

    let statuses = dispatcher.server_statuses().await;
    assert!(matches!(statuses["crash"], ServerStatus::Failed(_)));

    let reasons = dispatcher.failure_reasons().await;
    assert!(!reasons["crash"].is_empty());
    assert!(dispatcher.tool_definitions().await.is_empty());
}

#[tokio::test]
async fn failing_server_does_not_poison_siblings() {
    let url = spawn_http_stub("ping", "pong").await;

    let mut config = McpConfig::new();
    config.add_server("good", ServerConfig::http(url.as_str()).with_timeouts(10, 10));
    config.add_server(
        "bad",
        ServerConfig::stdio("/nonexistent/toolmux-missing-server").with_timeouts(10, 10),
    );

    let dispatcher = McpDispatcher::from_config(&config).unwrap();
    dispatcher.initialize().await;

    let statuses = dispatcher.server_statuses().await;
    assert_eq!(statuses["good"], ServerStatus::Ready);
    assert!(matches!(statuses["bad"], ServerStatus::Failed(_)));

    // The aggregate catalog is exactly the good server's tools.
    let defs = dispatcher.tool_definitions().await;
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "ping");

    let reasons = dispatcher.failure_reasons().await;
    assert!(reasons.contains_key("bad"));
    assert!(!reasons.contains_key("good"));
}

#[tokio::test]
async fn double_initialization_yields_same_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_stdio_stub(dir.path(), "echo", "echoed");

    let mut config = McpConfig::new();
    config.add_server(
        "proc",
        ServerConfig::stdio(script.display().to_string()).with_timeouts(10, 10),
    );

    let dispatcher = McpDispatcher::from_config(&config).unwrap();
    dispatcher.initialize().await;
    let first: Vec<String> = dispatcher
        .tool_definitions()
        .await
        .into_iter()
        .map(|d| d.name)
        .collect();

    dispatcher.initialize().await;
    let second: Vec<String> = dispatcher
        .tool_definitions()
        .await
        .into_iter()
        .map(|d| d.name)
        .collect();

    assert_eq!(first, vec!["echo"]);
    assert_eq!(first, second);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn unknown_tool_returns_failed_result() {
    let dispatcher = UnifiedDispatcher::new(
        local_registry(&["read_file"]),
        McpDispatcher::from_config(&McpConfig::new()).unwrap(),
    );
    dispatcher.initialize().await;

    let response = dispatcher.call("never_registered", json!({"a": 1})).await;
    assert!(!response.success);
    assert!(!response.error.as_deref().unwrap_or("").is_empty());
}

#[tokio::test]
async fn local_tools_take_precedence_over_external() {
    let url = spawn_http_stub("read_file", "remote file contents").await;

    let mut config = McpConfig::new();
    config.add_server("web", ServerConfig::http(url.as_str()).with_timeouts(10, 10));

    let remote = McpDispatcher::from_config(&config).unwrap();
    let dispatcher = UnifiedDispatcher::new(local_registry(&["read_file"]), remote);
    dispatcher.initialize().await;

    let descs = dispatcher.expose_descs().await;
    assert_eq!(descs.len(), 1);
    assert_eq!(descs[0].description, "A built-in test tool");

    let response = dispatcher.call("read_file", json!({})).await;
    assert_eq!(response.source, ToolSource::Local);
    assert_eq!(response.content, "built-in result");
}

#[tokio::test]
async fn config_file_roundtrip_drives_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_stdio_stub(dir.path(), "echo", "echoed");

    let config_path = dir.path().join("servers.json");
    std::fs::write(
        &config_path,
        json!({
            "mcp_servers": {
                "proc": {
                    "command": script.display().to_string(),
                    "startup_timeout_sec": 10,
                    "tool_timeout_sec": 10
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let config = McpConfig::load_from_file(&config_path).unwrap();
    let dispatcher = McpDispatcher::from_config(&config).unwrap();
    dispatcher.initialize().await;

    let response = dispatcher.call_tool("echo", json!({})).await;
    assert!(response.success, "echo failed: {:?}", response.error);
    assert_eq!(response.content, "echoed");

    dispatcher.shutdown().await;
}
