//! Shared fixtures for integration tests.
//!
//! - [`RecordingEngine`]: scripted SQL engine that logs every statement and
//!   writes one page per executed statement, so partial batches are visible
//! - [`CountingProvider`]: wraps in-memory scopes and counts every access

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use shardlite::kv::DurableStore;
use shardlite::kv::InMemoryProvider;
use shardlite::kv::StoreError;
use shardlite::kv::StoreProvider;
use shardlite::page::Page;
use shardlite::page::PageStore;
use shardlite::server::AppState;
use shardlite::server::BootstrapDocument;
use shardlite::server::build_router;
use shardlite::sharding::ShardId;
use shardlite::sharding::ShardRegistry;
use shardlite::sql::Diagnostics;
use shardlite::sql::EngineError;
use shardlite::sql::SqlEngine;
use shardlite::sql::SqlParam;

/// Statements containing this marker fail.
pub const FAIL_MARKER: &str = "FAIL";

/// Diagnostic line the engine emits before failing.
pub const FAIL_DIAGNOSTIC: &str = "engine: statement rejected\n";

/// One call seen by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub is_query: bool,
}

/// Fake engine. `execute` stores the statement text in the next free page
/// (page 0 holds the count), `query_raw` returns the statements written so
/// far as a JSON array.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn record(&self, sql: &str, params: &[SqlParam], is_query: bool) {
        self.calls.lock().push(RecordedCall {
            sql: sql.to_string(),
            params: params.to_vec(),
            is_query,
        });
    }

    fn fail(diagnostics: &mut Diagnostics, sql: &str) -> EngineError {
        diagnostics.push(FAIL_DIAGNOSTIC);
        EngineError::Statement {
            message: format!("cannot run: {sql}"),
        }
    }
}

async fn written_statements(pages: &PageStore) -> Result<Vec<String>, EngineError> {
    let header = pages.get_page(0).await.map_err(|source| EngineError::PageIo { source })?;
    let count = header.as_bytes()[0] as u64;
    let mut statements = Vec::new();
    for ix in 1..=count {
        let page = pages.get_page(ix).await.map_err(|source| EngineError::PageIo { source })?;
        let end = page.as_bytes().iter().position(|b| *b == 0).unwrap_or(page.as_bytes().len());
        statements.push(String::from_utf8_lossy(&page.as_bytes()[..end]).into_owned());
    }
    Ok(statements)
}

#[async_trait]
impl SqlEngine for RecordingEngine {
    async fn execute(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        self.record(sql, params, false);
        if sql.contains(FAIL_MARKER) {
            return Err(Self::fail(diagnostics, sql));
        }

        let mut header = pages.get_page(0).await.map_err(|source| EngineError::PageIo { source })?;
        let next = header.as_bytes()[0] + 1;
        let body = Page::from_bytes(sql.as_bytes()).map_err(|source| EngineError::PageIo { source })?;
        pages.put_page(next as u64, &body).await.map_err(|source| EngineError::PageIo { source })?;
        header.as_mut_bytes()[0] = next;
        pages.put_page(0, &header).await.map_err(|source| EngineError::PageIo { source })?;
        Ok(())
    }

    async fn query_raw(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<String, EngineError> {
        self.record(sql, params, true);
        if sql.contains(FAIL_MARKER) {
            return Err(Self::fail(diagnostics, sql));
        }
        let statements = written_statements(pages).await?;
        serde_json::to_string(&statements).map_err(|e| EngineError::Statement { message: e.to_string() })
    }
}

/// Counts every `get`/`put` across all scopes it hands out.
#[derive(Debug, Default)]
pub struct CountingProvider {
    inner: InMemoryProvider,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn accesses(&self) -> usize {
        self.reads() + self.writes()
    }

    pub fn scope_count(&self) -> usize {
        self.inner.scope_count()
    }
}

impl StoreProvider for CountingProvider {
    fn scope(&self, shard_id: &ShardId) -> Arc<dyn DurableStore> {
        Arc::new(CountingStore {
            inner: self.inner.scope(shard_id),
            reads: Arc::clone(&self.reads),
            writes: Arc::clone(&self.writes),
        })
    }
}

struct CountingStore {
    inner: Arc<dyn DurableStore>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

#[async_trait]
impl DurableStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }
}

/// A router over counting storage and the recording engine.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<ShardRegistry>,
    pub provider: Arc<CountingProvider>,
    pub engine: Arc<RecordingEngine>,
}

pub fn test_app() -> TestApp {
    test_app_with_limit(shardlite::constants::DEFAULT_MAX_BODY_BYTES)
}

pub fn test_app_with_limit(max_body_bytes: usize) -> TestApp {
    let provider = CountingProvider::new();
    let engine = RecordingEngine::new();
    let registry = Arc::new(ShardRegistry::new(provider.clone(), engine.clone()));
    let state = AppState::new(Arc::clone(&registry), BootstrapDocument::builtin());
    TestApp {
        router: build_router(state, max_body_bytes),
        registry,
        provider,
        engine,
    }
}
