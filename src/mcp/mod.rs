// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! External tool servers over the Model Context Protocol (MCP).
//!
//! This module connects the dispatch layer to remote tool servers. Each
//! configured server is reached over one of two transports, selected from
//! the shape of its configuration entry.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       McpDispatcher                        │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │                    ServerRegistry                    │  │
//! │  │  ┌────────────┐  ┌────────────┐  ┌────────────┐     │  │
//! │  │  │  Server    │  │  Server    │  │  Server    │     │  │
//! │  │  │ Instance   │  │ Instance   │  │ Instance   │     │  │
//! │  │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘     │  │
//! │  └────────┼───────────────┼───────────────┼────────────┘  │
//! └───────────┼───────────────┼───────────────┼───────────────┘
//!             │               │               │
//!       ┌─────▼─────┐   ┌─────▼─────┐   ┌─────▼─────┐
//!       │   HTTP    │   │   Stdio   │   │   HTTP    │
//!       │ Transport │   │ Transport │   │ Transport │
//!       └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux::mcp::{McpConfig, McpDispatcher};
//!
//! // Load configuration
//! let config = McpConfig::load_from_file("servers.json")?;
//!
//! // Build and initialize all servers concurrently
//! let dispatcher = McpDispatcher::from_config(&config)?;
//! dispatcher.initialize().await;
//!
//! // Aggregate catalog, route a call
//! let tools = dispatcher.tool_definitions().await;
//! let result = dispatcher.call_tool("search", input).await;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod transport;
pub mod types;

pub use config::{McpConfig, ServerConfig, TransportKind};
pub use dispatcher::McpDispatcher;
pub use error::McpError;
pub use registry::{ServerInstance, ServerRegistry, ServerState};
pub use transport::{HttpTransport, StdioTransport, TransportClient};
pub use types::{McpContent, McpToolInfo, McpToolResult, ServerStatus};
