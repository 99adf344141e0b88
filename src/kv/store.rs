//! In-memory implementation of [`DurableStore`].
//!
//! Deterministic and non-persistent: values live as long as the provider.
//! Mirrors the redb backend's semantics without disk I/O, which makes it the
//! default fixture for unit and property tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::DurableStore;
use super::StoreError;
use super::StoreProvider;
use crate::sharding::ShardId;

/// A single shard's in-memory key-value scope.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of keys written so far.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Provider keeping one [`InMemoryStore`] per shard id.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    scopes: parking_lot::Mutex<HashMap<ShardId, Arc<InMemoryStore>>>,
}

impl InMemoryProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of shard scopes created so far.
    pub fn scope_count(&self) -> usize {
        self.scopes.lock().len()
    }
}

impl StoreProvider for InMemoryProvider {
    fn scope(&self, shard_id: &ShardId) -> Arc<dyn DurableStore> {
        let mut scopes = self.scopes.lock();
        let store = scopes.entry(*shard_id).or_insert_with(InMemoryStore::new);
        Arc::clone(store) as Arc<dyn DurableStore>
    }
}
