//! Redb-backed implementation of [`DurableStore`].
//!
//! One redb file holds every shard hosted by the process. Each shard owns a
//! table named `shard:<hex id>`, keyed by the decimal page index string, so
//! shard scopes cannot collide and a shard's data can be dropped as a unit.
//!
//! Redb transactions are blocking; every call hops onto the blocking pool.
//! Writes use redb's default immediate durability, so a successful `put`
//! has been fsynced.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::Database;
use redb::TableDefinition;
use snafu::ResultExt;

use super::DurableStore;
use super::StoreError;
use super::StoreProvider;
use super::error::BeginTransactionSnafu;
use super::error::CommitSnafu;
use super::error::CreateDirectorySnafu;
use super::error::JoinSnafu;
use super::error::OpenDatabaseSnafu;
use super::error::OpenTableSnafu;
use super::error::StorageSnafu;
use crate::constants::SHARD_TABLE_PREFIX;
use crate::sharding::ShardId;

/// Opens (or creates) the redb file and scopes it per shard.
#[derive(Clone)]
pub struct RedbProvider {
    db: Arc<Database>,
}

impl RedbProvider {
    /// Create or open the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context(CreateDirectorySnafu {
                path: parent.display().to_string(),
            })?;
        }

        let db = Database::create(path).context(OpenDatabaseSnafu {
            path: path.display().to_string(),
        })?;
        tracing::info!(path = %path.display(), "opened redb page database");
        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreProvider for RedbProvider {
    fn scope(&self, shard_id: &ShardId) -> Arc<dyn DurableStore> {
        Arc::new(RedbStore {
            db: Arc::clone(&self.db),
            table: format!("{SHARD_TABLE_PREFIX}{shard_id}"),
        })
    }
}

/// A single shard's table inside the shared redb file.
pub struct RedbStore {
    db: Arc<Database>,
    table: String,
}

impl RedbStore {
    pub fn table_name(&self) -> &str {
        &self.table
    }
}

fn read_value(db: &Database, table: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    let definition: TableDefinition<&str, &[u8]> = TableDefinition::new(table);
    let read_txn = db.begin_read().context(BeginTransactionSnafu)?;
    let table_handle = match read_txn.open_table(definition) {
        Ok(handle) => handle,
        // Nothing was ever written to this shard.
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(source) => {
            return Err(source).context(OpenTableSnafu { table });
        }
    };
    let value = table_handle.get(key).context(StorageSnafu { key })?;
    Ok(value.map(|guard| guard.value().to_vec()))
}

fn write_value(db: &Database, table: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
    let definition: TableDefinition<&str, &[u8]> = TableDefinition::new(table);
    let write_txn = db.begin_write().context(BeginTransactionSnafu)?;
    {
        let mut table_handle = write_txn.open_table(definition).context(OpenTableSnafu { table })?;
        table_handle.insert(key, value).context(StorageSnafu { key })?;
    }
    write_txn.commit().context(CommitSnafu { table })?;
    Ok(())
}

#[async_trait]
impl DurableStore for RedbStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let db = Arc::clone(&self.db);
        let table = self.table.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || read_value(&db, &table, &key))
            .await
            .context(JoinSnafu)?
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let table = self.table.clone();
        let key = key.to_string();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || write_value(&db, &table, &key, &value))
            .await
            .context(JoinSnafu)?
    }
}
