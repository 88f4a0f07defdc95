// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Toolmux - unified tool dispatch for AI agents.
//!
//! One namespace over local tool handlers and tools exposed by remote MCP
//! servers, reachable over HTTP streams or child-process stdio pipes. The
//! agent hands a tool name and a JSON argument bundle to the dispatcher and
//! always gets back one normalized result, whichever backend served it.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (ToolDefinition, ToolResponse, ToolSource)
//! - [`error`] - Error types and result aliases
//! - [`telemetry`] - Tracing, metrics, and observability infrastructure
//! - [`tools`] - Local tool handler trait and registry
//! - [`mcp`] - External server configuration, transports, registry and dispatcher
//! - [`dispatch`] - The unified dispatcher merging both tool sources
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux::dispatch::UnifiedDispatcher;
//! use toolmux::mcp::{McpConfig, McpDispatcher};
//! use toolmux::tools::ToolRegistryBuilder;
//!
//! // Local tools supplied by the embedding application
//! let mut builder = ToolRegistryBuilder::new();
//! builder.register(MyReadFileTool);
//! let local = builder.build();
//!
//! // External servers from the configuration document
//! let config = McpConfig::load_from_file("servers.json")?;
//! let remote = McpDispatcher::from_config(&config)?;
//!
//! // One namespace for the agent
//! let dispatcher = UnifiedDispatcher::new(local, remote);
//! dispatcher.initialize().await;
//!
//! let catalog = dispatcher.expose_descs().await;
//! let result = dispatcher.call("search", serde_json::json!({"q": "tokio"})).await;
//! ```

pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod telemetry;
pub mod tools;
pub mod types;

// Re-export commonly used types at crate root
pub use dispatch::{ToolRoute, UnifiedDispatcher};
pub use error::{ConfigError, Result, ToolError};
pub use mcp::{McpConfig, McpDispatcher, McpError, ServerConfig, ServerStatus};
pub use tools::{ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};
pub use types::{InputSchema, ToolDefinition, ToolResponse, ToolSource};

/// Toolmux version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
