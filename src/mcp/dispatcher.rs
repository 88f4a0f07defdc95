// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! External-tool dispatcher.
//!
//! Owns the [`ServerRegistry`] and orchestrates it: initializes every
//! configured server concurrently with isolated failure handling,
//! aggregates the surviving tool lists into one name-to-route map, and
//! forwards calls to the owning server's transport.
//!
//! Initialization is best-effort parallel. Every server's
//! `initialize` + `tools/list` runs as its own task on a
//! [`tokio::task::JoinSet`], bounded by that server's startup timeout; the
//! dispatcher is ready once all outcomes - success or failure - have
//! resolved. A failed server contributes zero tools and keeps its failure
//! reason retrievable; it never aborts a sibling or the dispatcher.
//!
//! Collision policy between two external servers: aggregation walks servers
//! in sorted-name order and the first server advertising a tool name owns
//! it; later duplicates are skipped with a warning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

#[cfg(feature = "telemetry")]
use std::time::Instant;

use tracing::{debug, info, warn};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::types::{InputSchema, ToolDefinition, ToolResponse, ToolSource};

use super::config::McpConfig;
use super::error::McpError;
use super::registry::{ServerInstance, ServerRegistry};
use super::types::ServerStatus;

/// Dispatcher over all configured external tool servers.
pub struct McpDispatcher {
    /// The servers, built once from configuration.
    registry: Arc<ServerRegistry>,

    /// Tool name to owning server, rebuilt on (re)initialization.
    routes: RwLock<HashMap<String, Arc<ServerInstance>>>,
}

impl McpDispatcher {
    /// Create a dispatcher over an existing registry.
    pub fn new(registry: ServerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Build the registry from configuration and wrap it.
    ///
    /// Malformed server entries fail here, before any connection attempt.
    pub fn from_config(config: &McpConfig) -> Result<Self, McpError> {
        Ok(Self::new(ServerRegistry::from_config(config)?))
    }

    /// Get the underlying registry.
    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    /// Initialize every server concurrently and cache the tool catalog.
    ///
    /// Fan-out/fan-in: one task per server, each bounded by the server's
    /// own startup timeout so a hanging server degrades to
    /// `Failed("timed out ...")` instead of stalling the join. Calling this
    /// again re-runs discovery and rebuilds the same catalog - it never
    /// doubles entries.
    pub async fn initialize(&self) {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let mut set = JoinSet::new();

        for instance in self.registry.iter() {
            let instance = Arc::clone(instance);
            set.spawn(async move {
                init_server(&instance).await;
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                // A panicking init task only loses that server's outcome.
                warn!(error = %e, "server initialization task failed to join");
            }
        }

        self.rebuild_routes().await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("mcp.dispatcher.initialize", start.elapsed());
    }

    /// Rebuild the tool-to-server route map from current server states.
    async fn rebuild_routes(&self) {
        let mut routes: HashMap<String, Arc<ServerInstance>> = HashMap::new();

        // Sorted-name registry order makes first-wins deterministic.
        for instance in self.registry.iter() {
            let state = instance.state().await;
            if !(state.enabled && state.status.is_ready()) {
                continue;
            }

            for tool in &state.tools {
                if let Some(owner) = routes.get(&tool.name) {
                    warn!(
                        tool = %tool.name,
                        owner = %owner.name(),
                        duplicate = %instance.name(),
                        "external tool name collision, keeping first-registered server"
                    );
                    continue;
                }
                routes.insert(tool.name.clone(), Arc::clone(instance));
            }
        }

        let mut guard = self.routes.write().await;
        *guard = routes;
    }

    /// Aggregated tool definitions from all ready, enabled servers.
    ///
    /// Order is deterministic: servers in sorted-name order, each server's
    /// tools in advertised order, collisions resolved first-wins.
    pub async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut definitions = Vec::new();

        for instance in self.registry.iter() {
            let state = instance.state().await;
            if !(state.enabled && state.status.is_ready()) {
                continue;
            }

            for tool in &state.tools {
                if !seen.insert(tool.name.clone()) {
                    continue;
                }

                definitions.push(
                    ToolDefinition::new(
                        &tool.name,
                        tool.description.clone().unwrap_or_else(|| {
                            format!("Tool from server '{}'", instance.name())
                        }),
                    )
                    .with_schema(InputSchema::from_json_schema(&tool.input_schema)),
                );
            }
        }

        definitions
    }

    /// The current tool-to-server routing map.
    pub async fn routes(&self) -> HashMap<String, Arc<ServerInstance>> {
        self.routes.read().await.clone()
    }

    /// Route a call to the server owning `tool_name`.
    ///
    /// Unknown names and transport failures come back as failed
    /// [`ToolResponse`]s; nothing escapes as a panic or error value.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> ToolResponse {
        let owner = {
            let routes = self.routes.read().await;
            routes.get(tool_name).cloned()
        };

        let Some(instance) = owner else {
            return ToolResponse::failure(
                format!("unknown external tool '{tool_name}'"),
                ToolSource::Dispatcher,
            );
        };

        let source = ToolSource::Server(instance.name().to_string());

        debug!(tool = %tool_name, server = %instance.name(), "routing external tool call");

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let outcome = instance.client().call_tool(tool_name, arguments).await;

        #[cfg(feature = "telemetry")]
        {
            let success = matches!(&outcome, Ok(result) if result.success);
            GLOBAL_METRICS.record_tool(
                &format!("mcp.{}.{}", instance.name(), tool_name),
                start.elapsed(),
                success,
            );
        }

        match outcome {
            Ok(result) => {
                if result.is_error {
                    ToolResponse::failure(result.as_text(), source)
                } else {
                    ToolResponse::success(result.as_text(), source)
                }
            }
            Err(e) => ToolResponse::failure(e.to_string(), source),
        }
    }

    /// Health status of every server.
    pub async fn server_statuses(&self) -> BTreeMap<String, ServerStatus> {
        let mut statuses = BTreeMap::new();
        for instance in self.registry.iter() {
            statuses.insert(instance.name().to_string(), instance.status().await);
        }
        statuses
    }

    /// Failure reasons of servers that did not initialize.
    pub async fn failure_reasons(&self) -> BTreeMap<String, String> {
        let mut reasons = BTreeMap::new();
        for instance in self.registry.iter() {
            if let ServerStatus::Failed(reason) = instance.status().await {
                reasons.insert(instance.name().to_string(), reason);
            }
        }
        reasons
    }

    /// Re-include a server's tools in aggregation.
    pub async fn enable_server(&self, name: &str) -> Result<(), McpError> {
        let instance = self
            .registry
            .get(name)
            .ok_or_else(|| McpError::ServerNotFound(name.to_string()))?;
        instance.set_enabled(true).await;
        self.rebuild_routes().await;
        Ok(())
    }

    /// Exclude a server's tools from aggregation without tearing it down.
    pub async fn disable_server(&self, name: &str) -> Result<(), McpError> {
        let instance = self
            .registry
            .get(name)
            .ok_or_else(|| McpError::ServerNotFound(name.to_string()))?;
        instance.set_enabled(false).await;
        self.rebuild_routes().await;
        Ok(())
    }

    /// Tear down every server: close connections, kill children.
    pub async fn shutdown(&self) {
        for instance in self.registry.iter() {
            instance.client().shutdown().await;
        }
        self.routes.write().await.clear();
    }
}

/// Initialize one server, recording the outcome in its state.
async fn init_server(instance: &ServerInstance) {
    let timeout = Duration::from_secs(instance.config().startup_timeout_sec);
    let timeout_secs = timeout.as_secs();

    let outcome = tokio::time::timeout(timeout, async {
        instance.client().initialize().await?;
        instance.client().list_tools().await
    })
    .await;

    match outcome {
        Ok(Ok(tools)) => {
            info!(
                server = %instance.name(),
                transport = instance.client().kind(),
                tools = tools.len(),
                "external server ready"
            );
            instance.mark_ready(tools).await;
        }
        Ok(Err(e)) => {
            warn!(server = %instance.name(), error = %e, "external server failed to initialize");
            instance.mark_failed(e.to_string()).await;
        }
        Err(_) => {
            warn!(server = %instance.name(), timeout_secs, "external server timed out during initialization");
            instance
                .mark_failed(format!("timed out after {timeout_secs}s"))
                .await;
            // A hung child must not outlive its failed initialization.
            instance.client().shutdown().await;
        }
    }
}
