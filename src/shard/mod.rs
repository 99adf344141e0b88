//! A shard: one logical database's isolated page storage and its handler.
//!
//! Every request to a shard holds the shard's lock for its whole duration,
//! including all page I/O and every statement of an execute batch. Requests to
//! the same shard are therefore linearized; different shards run concurrently.

pub mod handler;
pub mod request;
pub mod validation;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use self::handler::ShardHandler;
pub use self::request::ShardRequest;
pub use self::request::ShardResponse;
pub use self::validation::ValidationError;
use crate::page::PageStore;
use crate::sharding::ShardId;
use crate::sql::SqlEngine;

/// A live shard.
pub struct Shard {
    id: ShardId,
    name: String,
    pages: PageStore,
    handler: Mutex<ShardHandler>,
}

impl Shard {
    pub fn new(id: ShardId, name: &str, pages: PageStore, engine: Arc<dyn SqlEngine>) -> Self {
        Self {
            id,
            name: name.to_string(),
            pages: pages.clone(),
            handler: Mutex::new(ShardHandler::new(id, pages, engine)),
        }
    }

    pub fn id(&self) -> ShardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shard's page store, for inspection outside the request path.
    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    /// Serve one request with exclusive access to the shard.
    pub async fn fetch(&self, request: ShardRequest) -> ShardResponse {
        let handler = self.handler.lock().await;
        handler.handle(request).await
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard").field("id", &self.id).field("name", &self.name).finish()
    }
}
