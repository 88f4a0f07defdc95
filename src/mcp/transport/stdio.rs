// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subprocess stdio transport.
//!
//! Launches the configured command once at initialization and speaks
//! newline-delimited JSON-RPC over the child's stdin/stdout. Requests carry
//! monotonically increasing ids and responses are correlated by id, so
//! server-initiated notifications interleaved on stdout are skipped rather
//! than misattributed. Calls are serialized per process behind an async
//! mutex; the child is killed on shutdown, on call timeout, and on drop.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

#[cfg(feature = "telemetry")]
use tracing::{debug, warn};

use super::super::config::ServerConfig;
use super::super::error::McpError;
use super::super::types::{McpToolInfo, McpToolResult};
use super::protocol;

/// Live pipes of a running child process.
struct ChildIo {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

/// Transport client speaking JSON-RPC over a child process's stdio.
pub struct StdioTransport {
    /// Server name, for diagnostics.
    server_name: String,

    /// Command to launch.
    command: String,

    /// Command arguments.
    args: Vec<String>,

    /// Environment variables for the child.
    env: HashMap<String, String>,

    /// Working directory for the child.
    cwd: Option<String>,

    /// Bound on the initialization handshake.
    startup_timeout: Duration,

    /// Bound on each tool call.
    tool_timeout: Duration,

    /// Request ID counter.
    request_id: AtomicU64,

    /// Running child, if any. The mutex serializes all pipe traffic.
    io: Mutex<Option<ChildIo>>,
}

impl StdioTransport {
    /// Create a transport from a subprocess-shaped server config.
    pub fn from_config(server_name: impl Into<String>, config: &ServerConfig) -> Result<Self, McpError> {
        let command = config.command.clone().ok_or_else(|| {
            McpError::Config("subprocess transport requires a 'command' field".to_string())
        })?;

        Ok(Self {
            server_name: server_name.into(),
            command,
            args: config.args.clone(),
            env: config.env.clone(),
            cwd: config.cwd.clone(),
            startup_timeout: Duration::from_secs(config.startup_timeout_sec),
            tool_timeout: Duration::from_secs(config.tool_timeout_sec),
            request_id: AtomicU64::new(0),
            io: Mutex::new(None),
        })
    }

    /// Get the server name.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Spawn the child and run the `initialize` handshake.
    ///
    /// Idempotent: a transport whose child is already running returns
    /// without respawning.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let mut guard = self.io.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::connection_failed(&self.server_name, e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::connection_failed(&self.server_name, "failed to open child stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::connection_failed(&self.server_name, "failed to open child stdout")
        })?;

        let mut io = ChildIo {
            child,
            stdin,
            reader: BufReader::new(stdout),
        };

        let id = self.next_request_id();
        let request = protocol::request(
            id,
            protocol::METHOD_INITIALIZE,
            Some(protocol::initialize_params()),
        );

        let timeout_secs = self.startup_timeout.as_secs();
        let handshake = tokio::time::timeout(self.startup_timeout, async {
            let response = roundtrip(&mut io, &request, id, &self.server_name).await?;
            protocol::result_of(&response)?;

            // Handshake completes with the initialized notification.
            let note = protocol::notification(protocol::METHOD_INITIALIZED);
            write_message(&mut io, &note, &self.server_name).await?;

            Ok::<_, McpError>(())
        })
        .await;

        match handshake {
            Ok(Ok(())) => {
                #[cfg(feature = "telemetry")]
                debug!(server = %self.server_name, command = %self.command, "stdio transport initialized");
                *guard = Some(io);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = io.child.kill().await;
                Err(e)
            }
            Err(_) => {
                let _ = io.child.kill().await;
                Err(McpError::ConnectionTimeout {
                    server: self.server_name.clone(),
                    timeout_secs,
                })
            }
        }
    }

    /// List the tools advertised by the server.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let id = self.next_request_id();
        let request = protocol::request(id, protocol::METHOD_LIST_TOOLS, None);

        let response = self.roundtrip_bounded(&request, id, self.tool_timeout).await?;
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
            .roundtrip_bounded(&request, id, self.tool_timeout)
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

    /// One serialized request/response exchange, bounded by `timeout`.
    ///
    /// After a timeout the pipe state is unknown, so the child is killed
    /// and subsequent calls observe a not-ready transport.
    async fn roundtrip_bounded(
        &self,
        request: &Value,
        id: u64,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| McpError::NotReady(self.server_name.clone()))?;

        let timeout_secs = timeout.as_secs();
        let exchange =
            tokio::time::timeout(timeout, roundtrip(io, request, id, &self.server_name)).await;

        match exchange {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                // The pipe is broken (EOF, IO error); tear the child down.
                if let Some(mut io) = guard.take() {
                    let _ = io.child.kill().await;
                }
                Err(e)
            }
            Err(_) => {
                #[cfg(feature = "telemetry")]
                warn!(server = %self.server_name, "stdio exchange timed out, killing child");
                if let Some(mut io) = guard.take() {
                    let _ = io.child.kill().await;
                }
                Err(McpError::ConnectionTimeout {
                    server: self.server_name.clone(),
                    timeout_secs,
                })
            }
        }
    }

    /// Terminate the child process, if running.
    pub async fn shutdown(&self) {
        let mut guard = self.io.lock().await;
        if let Some(mut io) = guard.take() {
            let _ = io.child.kill().await;
        }
    }
}

/// Write one newline-delimited JSON message to the child's stdin.
async fn write_message(io: &mut ChildIo, message: &Value, server: &str) -> Result<(), McpError> {
    let line = serde_json::to_string(message)?;
    io.stdin
        .write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(|e| McpError::connection_failed(server, e.to_string()))?;
    io.stdin
        .flush()
        .await
        .map_err(|e| McpError::connection_failed(server, e.to_string()))?;
    Ok(())
}

/// Send a request and read lines until the response with a matching id.
///
/// Lines that are not parseable JSON (stray server logging) and envelopes
/// with a different or missing id (notifications) are skipped. EOF means
/// the process died; its exit status is folded into the error.
async fn roundtrip(
    io: &mut ChildIo,
    request: &Value,
    id: u64,
    server: &str,
) -> Result<Value, McpError> {
    write_message(io, request, server).await?;

    loop {
        let mut line = String::new();
        let read = io
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| McpError::connection_failed(server, e.to_string()))?;

        if read == 0 {
            let detail = match io.child.try_wait() {
                Ok(Some(status)) => format!("process exited with {status}"),
                _ => "process closed stdout".to_string(),
            };
            return Err(McpError::connection_failed(server, detail));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };

        if protocol::response_id(&value) == Some(id) {
            return Ok(value);
        }
    }
}
