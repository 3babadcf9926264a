//! Connected tool servers keyed by name
//!
//! Servers are kept in a `BTreeMap`, so lookups that scan "all servers"
//! visit them in ascending name order and the first match is stable.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{ChatError, Result};
use crate::tools::ToolServer;

/// Registry of connected tool servers
#[derive(Default)]
pub struct ToolServerRegistry {
    servers: RwLock<BTreeMap<String, Arc<dyn ToolServer>>>,
}

impl std::fmt::Debug for ToolServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServerRegistry").finish_non_exhaustive()
    }
}

impl ToolServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected server under its own name
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::AlreadyConnected`] if the name is taken
    pub async fn insert(&self, server: Arc<dyn ToolServer>) -> Result<()> {
        let name = server.name().to_string();
        let mut servers = self.servers.write().await;
        if servers.contains_key(&name) {
            return Err(ChatError::AlreadyConnected(name).into());
        }
        tracing::info!("Registered tool server '{}'", name);
        servers.insert(name, server);
        Ok(())
    }

    /// Unregister a server, returning it if it was present
    pub async fn remove(&self, name: &str) -> Option<Arc<dyn ToolServer>> {
        self.servers.write().await.remove(name)
    }

    /// Whether a server with this name is registered
    pub async fn contains(&self, name: &str) -> bool {
        self.servers.read().await.contains_key(name)
    }

    /// Whether no servers are registered
    pub async fn is_empty(&self) -> bool {
        self.servers.read().await.is_empty()
    }

    /// Registered server names in ascending order
    pub async fn names(&self) -> Vec<String> {
        self.servers.read().await.keys().cloned().collect()
    }

    /// Copy of the current servers in ascending name order
    ///
    /// The lock is released before returning, so callers may await on the
    /// servers without blocking connects and disconnects.
    pub async fn snapshot(&self) -> Vec<Arc<dyn ToolServer>> {
        self.servers.read().await.values().cloned().collect()
    }

    /// Remove every server, returning them for disconnection
    pub async fn drain(&self) -> Vec<Arc<dyn ToolServer>> {
        let mut servers = self.servers.write().await;
        std::mem::take(&mut *servers).into_values().collect()
    }
}
