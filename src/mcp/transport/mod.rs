// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transport clients for reaching remote tool servers.
//!
//! A [`TransportClient`] is a closed set of tagged variants over the two
//! wire mechanisms - an HTTP stream endpoint and a subprocess stdio pipe -
//! behind one interface. Adding a third transport means adding one variant
//! here and one routing arm per method, not growing an inheritance
//! hierarchy.
//!
//! Both variants speak the same JSON-RPC tool protocol (see [`protocol`]);
//! they differ only in how the bytes move.

pub mod http;
pub mod protocol;
pub mod stdio;

#[cfg(test)]
pub mod stub;

use serde_json::Value;

use super::config::{ServerConfig, TransportKind};
use super::error::McpError;
use super::types::{McpToolInfo, McpToolResult};

pub use http::HttpTransport;
pub use stdio::StdioTransport;

/// Polymorphic client for one remote tool server.
pub enum TransportClient {
    /// Stream transport over HTTP.
    Http(HttpTransport),

    /// Subprocess stdio transport.
    Stdio(StdioTransport),

    /// Canned-response transport for tests.
    #[cfg(test)]
    Stub(stub::StubTransport),
}

impl TransportClient {
    /// Construct the transport variant selected by the config's shape.
    pub fn from_config(
        server_name: impl Into<String>,
        config: &ServerConfig,
    ) -> Result<Self, McpError> {
        let server_name = server_name.into();
        match config.transport_kind()? {
            TransportKind::Http => Ok(Self::Http(HttpTransport::from_config(server_name, config)?)),
            TransportKind::Stdio => {
                Ok(Self::Stdio(StdioTransport::from_config(server_name, config)?))
            }
        }
    }

    /// Short transport label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Stdio(_) => "stdio",
            #[cfg(test)]
            Self::Stub(_) => "stub",
        }
    }

    /// Establish the connection and run the protocol handshake.
    pub async fn initialize(&self) -> Result<(), McpError> {
        match self {
            Self::Http(t) => t.initialize().await,
            Self::Stdio(t) => t.initialize().await,
            #[cfg(test)]
            Self::Stub(t) => t.initialize().await,
        }
    }

    /// List the tools advertised by the server.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        match self {
            Self::Http(t) => t.list_tools().await,
            Self::Stdio(t) => t.list_tools().await,
            #[cfg(test)]
            Self::Stub(t) => t.list_tools().await,
        }
    }

    /// Call a tool on the server.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<McpToolResult, McpError> {
        match self {
            Self::Http(t) => t.call_tool(tool_name, arguments).await,
            Self::Stdio(t) => t.call_tool(tool_name, arguments).await,
            #[cfg(test)]
            Self::Stub(t) => t.call_tool(tool_name, arguments).await,
        }
    }

    /// Release the connection and terminate any child process.
    pub async fn shutdown(&self) {
        match self {
            Self::Http(t) => t.shutdown().await,
            Self::Stdio(t) => t.shutdown().await,
            #[cfg(test)]
            Self::Stub(t) => t.shutdown().await,
        }
    }
}
