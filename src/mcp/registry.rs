// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Server registry: one transport client per configured server.
//!
//! The registry walks the configuration once at startup, resolves each
//! entry's transport structurally (a `url` selects the stream transport, a
//! `command` the subprocess transport; anything else is rejected here, not
//! at call time), and holds the resulting [`ServerInstance`]s keyed by
//! server name. The map itself never changes after construction; only each
//! instance's health state mutates, behind its own lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::{McpConfig, ServerConfig};
use super::error::McpError;
use super::transport::TransportClient;
use super::types::{McpToolInfo, ServerStatus};

/// Mutable runtime state of one server.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Health state, driven by initialization.
    pub status: ServerStatus,

    /// Tool list cached from the last successful `tools/list`.
    pub tools: Vec<McpToolInfo>,

    /// Whether the server participates in aggregation.
    pub enabled: bool,
}

/// Runtime state of one configured server.
pub struct ServerInstance {
    /// Server name from the configuration document.
    name: String,

    /// The entry this instance was built from.
    config: ServerConfig,

    /// Resolved transport client.
    client: TransportClient,

    /// Health state and cached tools.
    state: RwLock<ServerState>,
}

impl ServerInstance {
    /// Create an instance in the `Pending` state.
    pub fn new(name: impl Into<String>, config: ServerConfig, client: TransportClient) -> Self {
        Self {
            name: name.into(),
            config,
            client,
            state: RwLock::new(ServerState {
                status: ServerStatus::Pending,
                tools: Vec::new(),
                enabled: true,
            }),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the transport client.
    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    /// Snapshot the current state.
    pub async fn state(&self) -> ServerState {
        self.state.read().await.clone()
    }

    /// Current health status.
    pub async fn status(&self) -> ServerStatus {
        self.state.read().await.status.clone()
    }

    /// Whether the server is enabled and ready to serve calls.
    pub async fn is_active(&self) -> bool {
        let state = self.state.read().await;
        state.enabled && state.status.is_ready()
    }

    /// Record a successful initialization with its tool list.
    pub(crate) async fn mark_ready(&self, tools: Vec<McpToolInfo>) {
        let mut state = self.state.write().await;
        state.status = ServerStatus::Ready;
        state.tools = tools;
    }

    /// Record a failed initialization.
    pub(crate) async fn mark_failed(&self, reason: impl Into<String>) {
        let mut state = self.state.write().await;
        state.status = ServerStatus::Failed(reason.into());
        state.tools.clear();
    }

    /// Toggle participation in aggregation.
    pub(crate) async fn set_enabled(&self, enabled: bool) {
        self.state.write().await.enabled = enabled;
    }
}

/// Registry of all configured servers, keyed by name.
///
/// Iteration order is the sorted server-name order of the underlying
/// `BTreeMap`, which keeps aggregation and collision resolution
/// deterministic.
pub struct ServerRegistry {
    servers: BTreeMap<String, Arc<ServerInstance>>,
}

impl ServerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            servers: BTreeMap::new(),
        }
    }

    /// Build the registry from a configuration document.
    ///
    /// Disabled entries are skipped. A malformed entry (both or neither of
    /// `url`/`command`) fails the whole build - configuration errors are
    /// fatal at load time.
    pub fn from_config(config: &McpConfig) -> Result<Self, McpError> {
        let mut servers = BTreeMap::new();

        for (name, server_config) in config.enabled_servers() {
            let client = TransportClient::from_config(name.clone(), server_config)
                .map_err(|e| McpError::Config(format!("server '{name}': {e}")))?;

            servers.insert(
                name.clone(),
                Arc::new(ServerInstance::new(
                    name.clone(),
                    server_config.clone(),
                    client,
                )),
            );
        }

        Ok(Self { servers })
    }

    /// Get a server by name.
    pub fn get(&self, name: &str) -> Option<Arc<ServerInstance>> {
        self.servers.get(name).cloned()
    }

    /// Iterate servers in sorted-name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServerInstance>> {
        self.servers.values()
    }

    /// All server names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    /// Number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Insert a prebuilt instance (tests only).
    #[cfg(test)]
    pub fn insert(&mut self, instance: ServerInstance) {
        self.servers
            .insert(instance.name().to_string(), Arc::new(instance));
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
