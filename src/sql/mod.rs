//! SQL engine collaborator seam.
//!
//! The proxy does not parse or plan SQL. It hands validated statements to a
//! [`SqlEngine`] together with the shard's [`PageStore`], which the engine
//! uses as its virtual file system: every page the engine reads or writes
//! goes through `get_page`/`put_page`.
//!
//! Engines:
//! - [`SqliteEngine`] (feature `sqlite`): bundled SQLite over the page store
//! - [`UnavailableEngine`]: rejects every call, for builds without an engine

pub mod diagnostics;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use snafu::Snafu;

pub use self::diagnostics::Diagnostics;
pub use self::diagnostics::compose_error_message;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteEngine;
use crate::page::PageError;
use crate::page::PageStore;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Errors raised by an engine call.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("no SQL engine is configured"))]
    Unavailable,

    /// Statement-level failure reported by the engine itself.
    #[snafu(display("{message}"))]
    Statement { message: String },

    #[snafu(display("page I/O failed: {source}"))]
    PageIo { source: PageError },

    #[snafu(display("database image is corrupt: {reason}"))]
    CorruptImage { reason: String },

    #[snafu(display("failed to prepare engine scratch space: {source}"))]
    Scratch { source: std::io::Error },

    #[snafu(display("failed to encode result set: {source}"))]
    Encode { source: serde_json::Error },

    #[snafu(display("engine task failed: {source}"))]
    Join { source: tokio::task::JoinError },

    #[cfg(feature = "sqlite")]
    #[snafu(display("{source}"))]
    Sqlite { source: rusqlite::Error },
}

/// A page-oriented SQL engine.
///
/// Implementations must route all persistent state through `pages`; the shard
/// handler serializes calls per shard, so an engine never sees two concurrent
/// calls for the same page store.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Run one statement that produces no result set.
    async fn execute(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError>;

    /// Run execute-mode statements in order, stopping at the first failure.
    ///
    /// Statements that completed before a failure stay applied. On failure
    /// `diagnostics` holds only the lines emitted by the failing statement.
    /// Engines with connection state override this to run the whole batch on
    /// one session.
    async fn execute_batch(
        &self,
        pages: &PageStore,
        statements: &[&str],
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        for statement in statements {
            diagnostics.clear();
            self.execute(pages, statement, params, diagnostics).await?;
        }
        Ok(())
    }

    /// Run one statement and return its result set serialized as JSON.
    async fn query_raw(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<String, EngineError>;
}

/// Engine used when the crate is built without a SQL backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

#[async_trait]
impl SqlEngine for UnavailableEngine {
    async fn execute(
        &self,
        _pages: &PageStore,
        _sql: &str,
        _params: &[SqlParam],
        _diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    async fn query_raw(
        &self,
        _pages: &PageStore,
        _sql: &str,
        _params: &[SqlParam],
        _diagnostics: &mut Diagnostics,
    ) -> Result<String, EngineError> {
        Err(EngineError::Unavailable)
    }
}

/// The engine compiled into this build.
pub fn default_engine() -> std::sync::Arc<dyn SqlEngine> {
    #[cfg(feature = "sqlite")]
    {
        std::sync::Arc::new(SqliteEngine::new())
    }
    #[cfg(not(feature = "sqlite"))]
    {
        std::sync::Arc::new(UnavailableEngine)
    }
}
