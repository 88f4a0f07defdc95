// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Local tool system boundary.
//!
//! This module provides the infrastructure for registering and executing
//! built-in tools. The dispatch layer depends only on this boundary: each
//! tool supplies a name, a JSON-schema-shaped parameter description, and an
//! async callable returning a success/content/error result. The concrete
//! handlers (file I/O, shell execution, task lists) live with the embedding
//! application, not here.
//!
//! # Architecture
//!
//! - [`ToolHandler`] trait - Core abstraction for tool implementations
//! - [`ToolRegistry`] - Maps tool names to handlers, dispatches calls
//! - [`ToolRegistryBuilder`] - Registration of handlers at startup
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux::tools::{ToolRegistryBuilder, ToolOutput};
//!
//! let mut builder = ToolRegistryBuilder::new();
//! builder.register(MyTool);
//! let registry = builder.build();
//!
//! let result = registry.dispatch("my_tool", serde_json::json!({})).await?;
//! ```

pub mod registry;

pub use registry::{
    DispatchResult, ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder,
};

use crate::error::ToolError;
use serde::Deserialize;

/// Parse JSON arguments into a typed struct.
///
/// This is a helper function for tool handlers to deserialize their input.
pub fn parse_arguments<T>(arguments: &serde_json::Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}
