// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Types shared across the MCP subsystem.

use serde::{Deserialize, Serialize};

/// Information about a tool advertised by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    /// Tool name as exposed by the server.
    pub name: String,

    /// Tool description.
    pub description: Option<String>,

    /// JSON Schema for tool input.
    pub input_schema: serde_json::Value,
}

/// Result of a tool call against an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Whether the tool call was successful.
    pub success: bool,

    /// Result content blocks.
    pub content: Vec<McpContent>,

    /// Whether the server flagged the result as an error.
    #[serde(default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            content: vec![McpContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: vec![McpContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Get the text content as a single string.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                McpContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content types that can be returned by MCP tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    /// Plain text content.
    Text {
        /// The text content.
        text: String,
    },

    /// Image content.
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type of the image.
        mime_type: String,
    },

    /// Resource reference.
    Resource {
        /// URI of the resource.
        uri: String,
        /// Optional MIME type.
        mime_type: Option<String>,
        /// Optional text content.
        text: Option<String>,
    },
}

/// Health state of one configured server.
///
/// Every server starts `Pending`, and initialization drives it to exactly
/// one of `Ready` or `Failed`. A failed server contributes zero tools; its
/// reason stays retrievable for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    /// Created but not yet initialized.
    Pending,

    /// Initialized; tool list cached.
    Ready,

    /// Initialization failed with the given reason.
    Failed(String),
}

impl ServerStatus {
    /// Whether the server is ready to serve calls.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
