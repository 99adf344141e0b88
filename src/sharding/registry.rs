//! Registry of live shards, keyed by logical database name.
//!
//! The `ShardRegistry` resolves a name to its [`Shard`], creating the shard
//! on first reference. Creation is idempotent: concurrent first requests
//! for the same name observe one shard.
//!
//! # Tiger Style
//!
//! - Keyed by the exact name, never by the derived id
//! - Thread-safe: interior mutability behind a `parking_lot::RwLock`
//! - No I/O under the lock: shard creation only wires handles together

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ShardId;
use crate::kv::StoreProvider;
use crate::page::PageStore;
use crate::shard::Shard;
use crate::sql::SqlEngine;

/// Resolves logical database names to shards.
pub struct ShardRegistry {
    provider: Arc<dyn StoreProvider>,
    engine: Arc<dyn SqlEngine>,
    shards: RwLock<HashMap<String, Arc<Shard>>>,
}

impl ShardRegistry {
    /// Create an empty registry.
    ///
    /// # Arguments
    ///
    /// * `provider` - Source of each shard's durable key-value scope
    /// * `engine` - SQL engine bound to every shard's page store
    pub fn new(provider: Arc<dyn StoreProvider>, engine: Arc<dyn SqlEngine>) -> Self {
        Self {
            provider,
            engine,
            shards: RwLock::new(HashMap::new()),
        }
    }

    /// Get the shard for `name`, creating it if this is the first reference.
    pub fn get_or_create(&self, name: &str) -> Arc<Shard> {
        if let Some(shard) = self.shards.read().get(name) {
            return Arc::clone(shard);
        }

        let mut shards = self.shards.write();
        // Another request may have created it between the two locks.
        if let Some(shard) = shards.get(name) {
            return Arc::clone(shard);
        }

        let id = ShardId::from_name(name);
        let pages = PageStore::new(self.provider.scope(&id));
        let shard = Arc::new(Shard::new(id, name, pages, Arc::clone(&self.engine)));
        tracing::debug!(shard = %id, name, "created shard");
        shards.insert(name.to_string(), Arc::clone(&shard));
        shard
    }

    /// Get an existing shard without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<Shard>> {
        self.shards.read().get(name).cloned()
    }

    /// Number of shards created so far.
    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }

    /// Names of all live shards, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shards.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardRegistry").field("shards", &self.len()).finish()
    }
}
