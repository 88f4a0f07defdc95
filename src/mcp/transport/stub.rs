// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Canned-response transport for exercising the dispatch layer in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::super::error::McpError;
use super::super::types::{McpToolInfo, McpToolResult};

/// Transport that serves canned tools and responses without any I/O.
pub struct StubTransport {
    server_name: String,
    tools: Vec<McpToolInfo>,
    responses: HashMap<String, McpToolResult>,
    fail_init: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    /// Create a stub advertising the given tool names.
    pub fn with_tools(server_name: impl Into<String>, tool_names: &[&str]) -> Self {
        let tools = tool_names
            .iter()
            .map(|name| McpToolInfo {
                name: (*name).to_string(),
                description: Some(format!("stub tool {name}")),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            })
            .collect();

        Self {
            server_name: server_name.into(),
            tools,
            responses: HashMap::new(),
            fail_init: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a stub whose initialization fails with the given reason.
    pub fn failing(server_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            tools: Vec::new(),
            responses: HashMap::new(),
            fail_init: Some(reason.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the canned result for one tool.
    pub fn with_response(mut self, tool_name: impl Into<String>, result: McpToolResult) -> Self {
        self.responses.insert(tool_name.into(), result);
        self
    }

    /// Tool names that have been called, in order.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn initialize(&self) -> Result<(), McpError> {
        match &self.fail_init {
            Some(reason) => Err(McpError::init_failed(&self.server_name, reason)),
            None => Ok(()),
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        if let Some(reason) = &self.fail_init {
            return Err(McpError::init_failed(&self.server_name, reason));
        }
        Ok(self.tools.clone())
    }

    pub async fn call_tool(
        &self,
        tool_name: &str,
        _arguments: Value,
    ) -> Result<McpToolResult, McpError> {
        self.calls.lock().unwrap().push(tool_name.to_string());
        match self.responses.get(tool_name) {
            Some(result) => Ok(result.clone()),
            None => Ok(McpToolResult::text(format!("stub response for {tool_name}"))),
        }
    }

    pub async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_lists_and_calls() {
        let stub = StubTransport::with_tools("s", &["ping"])
            .with_response("ping", McpToolResult::text("pong"));

        stub.initialize().await.unwrap();
        let tools = stub.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);

        let result = stub.call_tool("ping", serde_json::json!({})).await.unwrap();
        assert_eq!(result.as_text(), "pong");
        assert_eq!(stub.recorded_calls(), vec!["ping".to_string()]);
    }

    #[tokio::test]
    async fn test_stub_failing() {
        let stub = StubTransport::failing("s", "boom");
        assert!(stub.initialize().await.is_err());
        assert!(stub.list_tools().await.is_err());
    }
}
