//! Durable key-value collaborator backing each shard's pages.
//!
//! A shard never talks to a backend directly: it receives an
//! `Arc<dyn DurableStore>` scoped to its own [`ShardId`] from a
//! [`StoreProvider`]. Two scopes never observe each other's keys.
//!
//! Backends:
//! - [`InMemoryProvider`]: process-local maps, for tests and ephemeral nodes
//! - [`RedbProvider`]: one redb file, one table per shard

pub mod error;
pub mod redb_store;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;

pub use self::error::StoreError;
pub use self::redb_store::RedbProvider;
pub use self::redb_store::RedbStore;
pub use self::store::InMemoryProvider;
pub use self::store::InMemoryStore;
use crate::sharding::ShardId;

/// Per-shard durable key-value store.
///
/// `put` must not return until the backend has acknowledged persistence.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value stored under `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Hands out the isolated store for a shard.
///
/// Calling `scope` twice with the same id yields handles to the same data.
pub trait StoreProvider: Send + Sync {
    fn scope(&self, shard_id: &ShardId) -> Arc<dyn DurableStore>;
}
