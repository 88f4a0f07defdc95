// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the toolmux dispatch layer.
//!
//! This module defines the data structures shared across the dispatch layer:
//! tool definitions with their JSON-schema-shaped input descriptions, and the
//! normalized invocation result every backend is flattened into.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Tool Definitions
// ============================================================================

/// JSON-schema-shaped description of a tool's input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: None,
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = Some(required);
        self
    }

    /// Build an `InputSchema` from a raw JSON Schema value.
    ///
    /// Remote servers describe their tools with arbitrary JSON Schema
    /// objects; this keeps the `properties` and `required` fields and drops
    /// anything the catalog does not represent.
    pub fn from_json_schema(schema: &serde_json::Value) -> Self {
        let mut input_schema = Self::new();

        if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
            for (key, value) in props {
                input_schema.properties.insert(key.clone(), value.clone());
            }
        }

        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            let required_fields: Vec<String> = required
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect();
            if !required_fields.is_empty() {
                input_schema.required = Some(required_fields);
            }
        }

        input_schema
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a tool that can be presented to the AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

// ============================================================================
// Invocation Results
// ============================================================================

/// Which backend produced a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "server")]
pub enum ToolSource {
    /// A built-in tool from the local registry.
    Local,
    /// A tool served by the named external server.
    Server(String),
    /// The dispatch layer itself (routing errors, unknown names).
    Dispatcher,
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Server(name) => write!(f, "server:{name}"),
            Self::Dispatcher => write!(f, "dispatcher"),
        }
    }
}

/// Normalized result of a tool invocation.
///
/// Every backend - local handler, HTTP server, subprocess server - is
/// flattened into this shape before the result reaches the agent. Created
/// fresh per call and never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Whether the invocation succeeded.
    pub success: bool,

    /// Result content (combined text output).
    pub content: String,

    /// Error message when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Provenance of the result.
    pub source: ToolSource,
}

impl ToolResponse {
    /// Create a successful response.
    pub fn success(content: impl Into<String>, source: ToolSource) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
            source,
        }
    }

    /// Create a failed response.
    pub fn failure(error: impl Into<String>, source: ToolSource) -> Self {
        let error = error.into();
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
            source,
        }
    }
}
