// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Unified dispatcher: one tool namespace over every backend.
//!
//! The agent sees exactly two views of the tool world, regardless of where
//! a tool lives: [`UnifiedDispatcher::expose_descs`] for the catalog it
//! hands the model, and [`UnifiedDispatcher::expose_funcs`] for the
//! invokable routes. Internally each name resolves to either the local
//! [`ToolRegistry`] or the external [`McpDispatcher`].
//!
//! Merge policy: on a name collision between a local tool and an external
//! one, the local tool wins - locality implies trust and control. The
//! shadowed external tool is logged, never silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::mcp::McpDispatcher;
use crate::tools::ToolRegistry;
use crate::types::{ToolDefinition, ToolResponse, ToolSource};

/// A uniform invokable route to one tool, local or remote.
pub enum ToolRoute {
    /// Dispatches through the local registry.
    Local {
        registry: Arc<ToolRegistry>,
        tool: String,
    },

    /// Dispatches through the external-tool dispatcher.
    Remote {
        dispatcher: Arc<McpDispatcher>,
        tool: String,
    },
}

impl ToolRoute {
    /// Whether this route targets a local tool.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// The tool name this route invokes.
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Local { tool, .. } => tool,
            Self::Remote { tool, .. } => tool,
        }
    }

    /// Invoke the tool with the given arguments.
    ///
    /// Always returns a well-formed [`ToolResponse`]; failures are data,
    /// not panics.
    pub async fn invoke(&self, arguments: Value) -> ToolResponse {
        match self {
            Self::Local { registry, tool } => invoke_local(registry, tool, arguments).await,
            Self::Remote { dispatcher, tool } => dispatcher.call_tool(tool, arguments).await,
        }
    }
}

/// Run a local tool and normalize its output.
async fn invoke_local(registry: &ToolRegistry, tool: &str, arguments: Value) -> ToolResponse {
    match registry.dispatch(tool, arguments).await {
        Ok(result) => {
            let content = result.output.content().to_string();
            if result.output.is_success() {
                ToolResponse::success(content, ToolSource::Local)
            } else {
                ToolResponse::failure(content, ToolSource::Local)
            }
        }
        Err(e) => ToolResponse::failure(e.to_string(), ToolSource::Local),
    }
}

/// Merges the local registry and the external dispatcher into the single
/// namespace the agent consumes.
pub struct UnifiedDispatcher {
    local: Arc<ToolRegistry>,
    remote: Arc<McpDispatcher>,
}

impl UnifiedDispatcher {
    /// Create a dispatcher over a local registry and an external dispatcher.
    pub fn new(local: ToolRegistry, remote: McpDispatcher) -> Self {
        Self {
            local: Arc::new(local),
            remote: Arc::new(remote),
        }
    }

    /// Get the local registry.
    pub fn local(&self) -> &ToolRegistry {
        &self.local
    }

    /// Get the external dispatcher.
    pub fn remote(&self) -> &McpDispatcher {
        &self.remote
    }

    /// Initialize all external servers (concurrent, best-effort).
    pub async fn initialize(&self) {
        self.remote.initialize().await;
    }

    /// The merged tool catalog, collision-resolved.
    ///
    /// Local definitions come first in name order, then external
    /// definitions in the external dispatcher's deterministic order, minus
    /// any name a local tool already claims.
    pub async fn expose_descs(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.local.definitions();

        for definition in self.remote.tool_definitions().await {
            if self.local.contains(&definition.name) {
                warn!(
                    tool = %definition.name,
                    "external tool shadowed by local tool with the same name"
                );
                continue;
            }
            definitions.push(definition);
        }

        definitions
    }

    /// The merged invocation map: tool name to uniform route.
    ///
    /// Local routes overwrite external ones on collision, making the
    /// local-wins policy hold for invocation as well as description.
    pub async fn expose_funcs(&self) -> HashMap<String, ToolRoute> {
        let mut routes: HashMap<String, ToolRoute> = HashMap::new();

        for name in self.remote.routes().await.into_keys() {
            routes.insert(
                name.clone(),
                ToolRoute::Remote {
                    dispatcher: Arc::clone(&self.remote),
                    tool: name,
                },
            );
        }

        for name in self.local.tool_names() {
            if routes.contains_key(name) {
                warn!(tool = %name, "external tool shadowed by local tool with the same name");
            }
            routes.insert(
                name.to_string(),
                ToolRoute::Local {
                    registry: Arc::clone(&self.local),
                    tool: name.to_string(),
                },
            );
        }

        routes
    }

    /// Route one call by name: local first, then external.
    pub async fn call(&self, tool_name: &str, arguments: Value) -> ToolResponse {
        if self.local.contains(tool_name) {
            return invoke_local(&self.local, tool_name, arguments).await;
        }

        if self.remote.routes().await.contains_key(tool_name) {
            return self.remote.call_tool(tool_name, arguments).await;
        }

        ToolResponse::failure(
            format!("unknown tool '{tool_name}'"),
            ToolSource::Dispatcher,
        )
    }

    /// Tear down all external servers.
    pub async fn shutdown(&self) {
        self.remote.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::error::ToolError;
    use crate::mcp::config::ServerConfig;
    use crate::mcp::registry::{ServerInstance, ServerRegistry};
    use crate::mcp::transport::{stub::StubTransport, TransportClient};
    use crate::mcp::types::McpToolResult;
    use crate::tools::{ToolHandler, ToolOutput, ToolRegistryBuilder};

    struct LocalEcho {
        name: String,
    }

    #[async_trait]
    impl ToolHandler for LocalEcho {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(&self.name, "Local echo tool")
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success("local result"))
        }
    }

    fn local_registry(names: &[&str]) -> ToolRegistry {
        let mut builder = ToolRegistryBuilder::new();
        for name in names {
            builder.register(LocalEcho {
                name: (*name).to_string(),
            });
        }
        builder.build()
    }

    fn remote_with(instances: Vec<(&str, StubTransport)>) -> McpDispatcher {
        let mut registry = ServerRegistry::new();
        for (name, stub) in instances {
            registry.insert(ServerInstance::new(
                name,
                ServerConfig::stdio("unused"),
                TransportClient::Stub(stub),
            ));
        }
        McpDispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_merged_catalog() {
        let dispatcher = UnifiedDispatcher::new(
            local_registry(&["read_file"]),
            remote_with(vec![("svc", StubTransport::with_tools("svc", &["search"]))]),
        );
        dispatcher.initialize().await;

        let descs = dispatcher.expose_descs().await;
        let names: Vec<&str> = descs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["read_file", "search"]);
    }

    #[tokio::test]
    async fn test_local_wins_collision_in_descs() {
        let dispatcher = UnifiedDispatcher::new(
            local_registry(&["search"]),
            remote_with(vec![("svc", StubTransport::with_tools("svc", &["search"]))]),
        );
        dispatcher.initialize().await;

        let descs = dispatcher.expose_descs().await;
        assert_eq!(descs.len(), 1);
        // The surviving descriptor is the local one.
        assert_eq!(descs[0].description, "Local echo tool");
    }

    #[tokio::test]
    async fn test_local_wins_collision_in_funcs() {
        let dispatcher = UnifiedDispatcher::new(
            local_registry(&["search"]),
            remote_with(vec![(
                "svc",
                StubTransport::with_tools("svc", &["search"])
                    .with_response("search", McpToolResult::text("remote result")),
            )]),
        );
        dispatcher.initialize().await;

        let funcs = dispatcher.expose_funcs().await;
        let route = funcs.get("search").unwrap();
        assert!(route.is_local());

        let response = route.invoke(serde_json::json!({})).await;
        assert!(response.success);
        assert_eq!(response.content, "local result");
        assert_eq!(response.source, ToolSource::Local);
    }

    #[tokio::test]
    async fn test_remote_route_invocation() {
        let dispatcher = UnifiedDispatcher::new(
            ToolRegistry::new(),
            remote_with(vec![(
                "svc",
                StubTransport::with_tools("svc", &["ping"])
                    .with_response("ping", McpToolResult::text("pong")),
            )]),
        );
        dispatcher.initialize().await;

        let funcs = dispatcher.expose_funcs().await;
        let route = funcs.get("ping").unwrap();
        assert!(!route.is_local());
        assert_eq!(route.tool_name(), "ping");

        let response = route.invoke(serde_json::json!({"a": 1})).await;
        assert!(response.success);
        assert_eq!(response.content, "pong");
        assert_eq!(response.source, ToolSource::Server("svc".to_string()));
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let dispatcher = UnifiedDispatcher::new(ToolRegistry::new(), remote_with(vec![]));
        dispatcher.initialize().await;

        let response = dispatcher.call("ghost", serde_json::json!({})).await;
        assert!(!response.success);
        assert!(!response.error.as_deref().unwrap_or("").is_empty());
        assert_eq!(response.source, ToolSource::Dispatcher);
    }

    #[tokio::test]
    async fn test_call_routes_by_origin() {
        let dispatcher = UnifiedDispatcher::new(
            local_registry(&["local_tool"]),
            remote_with(vec![(
                "svc",
                StubTransport::with_tools("svc", &["remote_tool"])
                    .with_response("remote_tool", McpToolResult::text("from server")),
            )]),
        );
        dispatcher.initialize().await;

        let local = dispatcher.call("local_tool", serde_json::json!({})).await;
        assert_eq!(local.source, ToolSource::Local);

        let remote = dispatcher.call("remote_tool", serde_json::json!({})).await;
        assert_eq!(remote.source, ToolSource::Server("svc".to_string()));
        assert_eq!(remote.content, "from server");
    }
}
