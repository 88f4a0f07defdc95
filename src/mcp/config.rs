// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP server configuration.
//!
//! Servers are configured under the `mcp_servers` top-level key of a JSON or
//! YAML document. The transport is selected structurally: an entry with a
//! `url` field speaks the stream transport, an entry with a `command` field
//! runs a subprocess. An entry with both or neither is a configuration
//! error, surfaced when the registry is built rather than at call time.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "mcp_servers": {
//!     "github": {
//!       "url": "https://mcp.github.com/v1",
//!       "headers": { "Authorization": "Bearer ${GITHUB_TOKEN}" }
//!     },
//!     "filesystem": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem", "/path"],
//!       "env": { "NODE_ENV": "production" },
//!       "startup_timeout_sec": 30,
//!       "tool_timeout_sec": 300
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::error::McpError;

/// MCP configuration containing all server definitions.
///
/// Servers are held in a `BTreeMap` so every iteration over the configured
/// set is deterministic, which keeps tool-name collision resolution
/// reproducible across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    /// Map of server name to server configuration.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl McpConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, dispatching on the extension.
    ///
    /// `.json` parses as JSON; `.yaml`/`.yml` parse as YAML. Anything else
    /// is a configuration error.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, McpError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| McpError::Config(format!("Failed to read config file: {e}")))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            other => Err(McpError::Config(format!(
                "Unsupported config extension {:?} for {}; expected .json, .yaml or .yml",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, McpError> {
        let full: FullConfig = serde_json::from_str(json)?;
        Ok(Self {
            servers: full.mcp_servers,
        })
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, McpError> {
        let full: FullConfig = serde_yaml::from_str(yaml)
            .map_err(|e| McpError::Config(format!("YAML parsing error: {e}")))?;
        Ok(Self {
            servers: full.mcp_servers,
        })
    }

    /// Get enabled servers in deterministic (sorted-name) order.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &ServerConfig)> {
        self.servers.iter().filter(|(_, c)| c.enabled)
    }

    /// Add a server configuration.
    pub fn add_server(&mut self, name: impl Into<String>, config: ServerConfig) {
        self.servers.insert(name.into(), config);
    }

    /// Remove a server configuration.
    pub fn remove_server(&mut self, name: &str) -> Option<ServerConfig> {
        self.servers.remove(name)
    }
}

/// Wire shape of the configuration document.
#[derive(Deserialize)]
struct FullConfig {
    #[serde(default)]
    mcp_servers: BTreeMap<String, ServerConfig>,
}

/// Configuration for a single MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// URL for the stream transport.
    pub url: Option<String>,

    /// Headers attached to every stream-transport request
    /// (values support `${ENV_VAR}` expansion).
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Command for the subprocess transport.
    pub command: Option<String>,

    /// Arguments for the subprocess transport.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables for the subprocess transport.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for the subprocess transport.
    pub cwd: Option<String>,

    /// Whether this server is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Startup timeout in seconds.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_sec: u64,

    /// Tool call timeout in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_sec: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_tool_timeout() -> u64 {
    300
}

impl ServerConfig {
    /// Create a stream transport configuration.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            headers: HashMap::new(),
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            enabled: true,
            startup_timeout_sec: default_startup_timeout(),
            tool_timeout_sec: default_tool_timeout(),
        }
    }

    /// Create a subprocess transport configuration.
    pub fn stdio(command: impl Into<String>) -> Self {
        Self {
            url: None,
            headers: HashMap::new(),
            command: Some(command.into()),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            enabled: true,
            startup_timeout_sec: default_startup_timeout(),
            tool_timeout_sec: default_tool_timeout(),
        }
    }

    /// Add command arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set environment variables.
    pub fn with_env(
        mut self,
        env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Set request headers.
    pub fn with_headers(
        mut self,
        headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set working directory.
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set timeouts (startup, per-call) in seconds.
    pub fn with_timeouts(mut self, startup_sec: u64, tool_sec: u64) -> Self {
        self.startup_timeout_sec = startup_sec;
        self.tool_timeout_sec = tool_sec;
        self
    }

    /// Resolve the transport kind from the shape of this entry.
    ///
    /// The presence of `url` vs `command` is the sole discriminator; an
    /// entry with both or neither is rejected here, at load time.
    pub fn transport_kind(&self) -> Result<TransportKind, McpError> {
        match (&self.url, &self.command) {
            (Some(_), None) => Ok(TransportKind::Http),
            (None, Some(_)) => Ok(TransportKind::Stdio),
            (Some(_), Some(_)) => Err(McpError::Config(
                "server entry has both 'url' and 'command'; exactly one is required".to_string(),
            )),
            (None, None) => Err(McpError::Config(
                "server entry has neither 'url' nor 'command'; exactly one is required"
                    .to_string(),
            )),
        }
    }

    /// Headers with `${ENV_VAR}` references expanded from the environment.
    ///
    /// Unset variables expand to the empty string.
    pub fn expanded_headers(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), expand_env(v)))
            .collect()
    }
}

/// Expand `${VAR}` references in a string from the process environment.
fn expand_env(value: &str) -> String {
    let mut result = value.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let expanded = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], expanded, &result[start + end + 1..]);
        } else {
            break;
        }
    }
    result
}

/// Transport kind resolved from a server configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Stream transport over HTTP.
    Http,

    /// Subprocess stdio transport.
    Stdio,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}
