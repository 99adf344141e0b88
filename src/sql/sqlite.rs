//! Bundled SQLite engine running over a shard's page store.
//!
//! Each engine call opens a [`Session`]: the shard's database image is
//! materialized from its pages into a scratch file and one connection is
//! opened on it. Every statement of the call runs on that connection on a
//! blocking thread, so transactions and temporary tables span the whole
//! batch. After a statement leaves the connection in autocommit mode, the
//! pages whose bytes changed are written back. Page 0 carries the SQLite
//! header; a zero page 0 means the shard has no database yet.
//!
//! Schema of the image is whatever the client created. The engine forces a
//! 4096-byte page size on new databases so one SQLite page is one shard page,
//! and keeps the rollback journal in memory so the image is the whole state.
//!
//! # Tiger Style
//!
//! - Image size bounded by `MAX_IMAGE_PAGES`
//! - Scratch files live in a per-session temporary directory, removed on drop
//! - Failed statements never write pages back
//! - A transaction still open when the session ends is rolled back unpersisted

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::params_from_iter;
use rusqlite::types::ToSql;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::Value;
use rusqlite::types::ValueRef;
use snafu::ResultExt;
use tempfile::TempDir;
use tracing::debug;

use super::Diagnostics;
use super::EncodeSnafu;
use super::EngineError;
use super::JoinSnafu;
use super::PageIoSnafu;
use super::ScratchSnafu;
use super::SqlEngine;
use super::SqlParam;
use super::SqliteSnafu;
use crate::constants::MAX_IMAGE_PAGES;
use crate::constants::PAGE_SIZE;
use crate::constants::SQLITE_HEADER_MAGIC;
use crate::constants::SQLITE_HEADER_PAGE_COUNT_OFFSET;
use crate::constants::SQLITE_HEADER_PAGE_SIZE_OFFSET;
use crate::page::Page;
use crate::page::PageIndex;
use crate::page::PageStore;

/// Name of the image file inside each session's scratch directory.
const IMAGE_FILE_NAME: &str = "shard.db";

/// SQLite engine whose virtual file system is a [`PageStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }

    async fn open_session(pages: &PageStore) -> Result<Session, EngineError> {
        let image = load_image(pages).await?;
        tokio::task::spawn_blocking(move || Session::open(image)).await.context(JoinSnafu)?
    }

    /// Run one statement on `session` and persist the pages it changed.
    /// The session is consumed on failure, rolling back any open transaction.
    async fn step<T: Send + 'static>(
        pages: &PageStore,
        session: Session,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
        work: StatementFn<T>,
    ) -> Result<(Session, T), EngineError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        let (lines, result) = tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            let result = session.run(&sql, &params, work, &mut lines).map(|(value, image)| (session, value, image));
            (lines, result)
        })
        .await
        .context(JoinSnafu)?;
        diagnostics.extend(lines);

        let (mut session, value, image) = result?;
        if let Some(image) = image {
            let written = write_back(pages, &session.persisted, &image).await?;
            debug!(pages_written = written, image_pages = image.len() / PAGE_SIZE, "statement applied");
            session.persisted = image;
        }
        Ok((session, value))
    }
}

#[async_trait]
impl SqlEngine for SqliteEngine {
    async fn execute(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        self.execute_batch(pages, &[sql], params, diagnostics).await
    }

    async fn execute_batch(
        &self,
        pages: &PageStore,
        statements: &[&str],
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        if statements.is_empty() {
            return Ok(());
        }

        let mut session = Self::open_session(pages).await?;
        for statement in statements {
            diagnostics.clear();
            let (next, ()) = Self::step(pages, session, statement, params, diagnostics, execute_statement).await?;
            session = next;
        }
        if !session.conn.is_autocommit() {
            debug!("batch ended inside a transaction, rolling it back");
        }
        Ok(())
    }

    async fn query_raw(
        &self,
        pages: &PageStore,
        sql: &str,
        params: &[SqlParam],
        diagnostics: &mut Diagnostics,
    ) -> Result<String, EngineError> {
        let session = Self::open_session(pages).await?;
        let (_, rows) = Self::step(pages, session, sql, params, diagnostics, query_statement).await?;
        serde_json::to_string(&serde_json::Value::Array(rows)).context(EncodeSnafu)
    }
}

type StatementFn<T> = fn(&Connection, &str, &[SqlParam]) -> rusqlite::Result<T>;

/// One connection over a scratch copy of a shard's image.
struct Session {
    conn: Connection,
    path: PathBuf,
    /// Image as last written to the page store.
    persisted: Vec<u8>,
    _scratch: TempDir,
}

impl Session {
    /// Copy `image` into a fresh scratch directory and open it.
    fn open(image: Vec<u8>) -> Result<Self, EngineError> {
        let scratch = tempfile::tempdir().context(ScratchSnafu)?;
        let path = scratch.path().join(IMAGE_FILE_NAME);
        std::fs::write(&path, &image).context(ScratchSnafu)?;
        let conn = open_image(&path)?;
        Ok(Self {
            conn,
            path,
            persisted: image,
            _scratch: scratch,
        })
    }

    /// Run one statement. The image is returned only once the connection is
    /// back in autocommit mode; inside a transaction it is `None`.
    fn run<T>(
        &self,
        sql: &str,
        params: &[SqlParam],
        work: StatementFn<T>,
        diagnostics: &mut Vec<String>,
    ) -> Result<(T, Option<Vec<u8>>), EngineError> {
        let value = work(&self.conn, sql, params).map_err(|err| {
            record_failure(&err, sql, diagnostics);
            EngineError::Sqlite { source: err }
        })?;
        if !self.conn.is_autocommit() {
            return Ok((value, None));
        }
        let image = std::fs::read(&self.path).context(ScratchSnafu)?;
        Ok((value, Some(image)))
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
            SqlParam::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlParam::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlParam::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Number of pages in the image described by a SQLite header page.
fn image_page_count(header: &Page) -> Result<u32, EngineError> {
    let bytes = header.as_bytes();
    if &bytes[..SQLITE_HEADER_MAGIC.len()] != SQLITE_HEADER_MAGIC {
        return Err(EngineError::CorruptImage {
            reason: "page 0 does not start with the SQLite header".into(),
        });
    }

    let offset = SQLITE_HEADER_PAGE_SIZE_OFFSET;
    let page_size = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
    if usize::from(page_size) != PAGE_SIZE {
        return Err(EngineError::CorruptImage {
            reason: format!("page size {page_size} does not match the {PAGE_SIZE}-byte shard page"),
        });
    }

    let offset = SQLITE_HEADER_PAGE_COUNT_OFFSET;
    let count = u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]);
    if count > MAX_IMAGE_PAGES {
        return Err(EngineError::CorruptImage {
            reason: format!("image of {count} pages exceeds the {MAX_IMAGE_PAGES}-page limit"),
        });
    }
    // Page 0 exists, so the image is at least one page even if the field is stale.
    Ok(count.max(1))
}

/// Concatenate the shard's pages into a database image.
async fn load_image(pages: &PageStore) -> Result<Vec<u8>, EngineError> {
    let header = pages.get_page(0).await.context(PageIoSnafu)?;
    if header.is_zeroed() {
        return Ok(Vec::new());
    }

    let count = image_page_count(&header)?;
    let mut image = Vec::with_capacity(count as usize * PAGE_SIZE);
    image.extend_from_slice(header.as_bytes());
    for ix in 1..PageIndex::from(count) {
        let page = pages.get_page(ix).await.context(PageIoSnafu)?;
        image.extend_from_slice(page.as_bytes());
    }
    Ok(image)
}

/// Persist every page of `after` that differs from `before`.
async fn write_back(pages: &PageStore, before: &[u8], after: &[u8]) -> Result<usize, EngineError> {
    let mut written = 0;
    for (ix, chunk) in after.chunks(PAGE_SIZE).enumerate() {
        let start = ix * PAGE_SIZE;
        if before.get(start..start + chunk.len()) == Some(chunk) {
            continue;
        }
        let page = Page::from_bytes(chunk).context(PageIoSnafu)?;
        pages.put_page(ix as PageIndex, &page).await.context(PageIoSnafu)?;
        written += 1;
    }
    Ok(written)
}

fn open_image(path: &Path) -> Result<Connection, EngineError> {
    let conn = Connection::open(path).context(SqliteSnafu)?;
    // page_size only takes effect on a database that has not been written yet.
    conn.pragma_update(None, "page_size", PAGE_SIZE as i64).context(SqliteSnafu)?;
    conn.pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get::<_, String>(0))
        .context(SqliteSnafu)?;
    conn.pragma_update(None, "synchronous", "OFF").context(SqliteSnafu)?;
    Ok(conn)
}

fn record_failure(err: &rusqlite::Error, sql: &str, diagnostics: &mut Vec<String>) {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        let code = failure.extended_code;
        diagnostics.push(format!("sqlite result code {code} ({})\n", rusqlite::ffi::code_to_str(code)));
    }
    diagnostics.push(format!("while running: {}\n", sql.trim()));
    debug!(error = %err, "sqlite statement failed");
}

fn execute_statement(conn: &Connection, sql: &str, params: &[SqlParam]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    // Step to completion; rows produced in execute mode are discarded.
    while rows.next()?.is_some() {}
    Ok(())
}

fn query_statement(
    conn: &Connection,
    sql: &str,
    params: &[SqlParam],
) -> rusqlite::Result<Vec<serde_json::Value>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = serde_json::Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            object.insert(name.clone(), value_to_json(row.get_ref(i)?));
        }
        out.push(serde_json::Value::Object(object));
    }
    Ok(out)
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryStore;

    fn pages() -> PageStore {
        PageStore::new(InMemoryStore::new())
    }

    async fn exec(engine: &SqliteEngine, pages: &PageStore, sql: &str) {
        let mut diagnostics = Diagnostics::new();
        engine.execute(pages, sql, &[], &mut diagnostics).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_shard_has_empty_image() {
        assert!(load_image(&pages()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_table_writes_header_page() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)").await;

        let header = pages.get_page(0).await.unwrap();
        assert_eq!(&header.as_bytes()[..16], SQLITE_HEADER_MAGIC);
        assert!(image_page_count(&header).unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_state_persists_across_calls() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)").await;
        exec(&engine, &pages, "INSERT INTO t (v) VALUES ('one')").await;

        let mut diagnostics = Diagnostics::new();
        let json = engine.query_raw(&pages, "SELECT id, v FROM t", &[], &mut diagnostics).await.unwrap();
        assert_eq!(json, r#"[{"id":1,"v":"one"}]"#);
    }

    #[tokio::test]
    async fn test_params_are_bound() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (a, b, c, d)").await;

        let params = vec![
            SqlParam::Text("x".into()),
            SqlParam::Integer(7),
            SqlParam::Bool(true),
            SqlParam::Null,
        ];
        let mut diagnostics = Diagnostics::new();
        engine.execute(&pages, "INSERT INTO t VALUES (?, ?, ?, ?)", &params, &mut diagnostics).await.unwrap();

        let json = engine.query_raw(&pages, "SELECT a, b, c, d FROM t", &[], &mut diagnostics).await.unwrap();
        assert_eq!(json, r#"[{"a":"x","b":7,"c":1,"d":null}]"#);
    }

    #[tokio::test]
    async fn test_failure_reports_diagnostics_and_leaves_pages() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (id INTEGER)").await;
        let header_before = pages.get_page(0).await.unwrap();

        let mut diagnostics = Diagnostics::new();
        let err = engine
            .execute(&pages, "INSERT INTO missing VALUES (1)", &[], &mut diagnostics)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no such table"));
        assert!(diagnostics.drain().iter().any(|line| line.contains("INSERT INTO missing")));
        assert_eq!(pages.get_page(0).await.unwrap(), header_before);
    }

    #[tokio::test]
    async fn test_failure_names_result_code() {
        let engine = SqliteEngine::new();
        let pages = pages();

        let mut diagnostics = Diagnostics::new();
        engine.execute(&pages, "SELEC 1", &[], &mut diagnostics).await.unwrap_err();
        let lines = diagnostics.drain();
        assert_eq!(lines[0], "sqlite result code 1 (SQL error or missing database)\n");
        assert_eq!(lines[1], "while running: SELEC 1\n");
    }

    #[tokio::test]
    async fn test_batch_shares_one_connection() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (v INTEGER)").await;

        let statements = [
            "CREATE TEMP TABLE scratch (v INTEGER)",
            "INSERT INTO scratch VALUES (4)",
            "BEGIN",
            "INSERT INTO t SELECT v FROM scratch",
            "COMMIT",
        ];
        let mut diagnostics = Diagnostics::new();
        engine.execute_batch(&pages, &statements, &[], &mut diagnostics).await.unwrap();

        let json = engine.query_raw(&pages, "SELECT v FROM t", &[], &mut diagnostics).await.unwrap();
        assert_eq!(json, r#"[{"v":4}]"#);
    }

    #[tokio::test]
    async fn test_open_transaction_is_not_persisted() {
        let engine = SqliteEngine::new();
        let pages = pages();
        exec(&engine, &pages, "CREATE TABLE t (v INTEGER)").await;
        let header_before = pages.get_page(0).await.unwrap();

        let mut diagnostics = Diagnostics::new();
        let statements = ["BEGIN", "INSERT INTO t VALUES (1)"];
        engine.execute_batch(&pages, &statements, &[], &mut diagnostics).await.unwrap();

        let statements = ["BEGIN", "INSERT INTO t VALUES (2)", "INSERT INTO missing VALUES (3)", "COMMIT"];
        engine.execute_batch(&pages, &statements, &[], &mut diagnostics).await.unwrap_err();
        assert!(diagnostics.drain().iter().all(|line| !line.contains("BEGIN")));

        assert_eq!(pages.get_page(0).await.unwrap(), header_before);
        let json = engine.query_raw(&pages, "SELECT v FROM t", &[], &mut diagnostics).await.unwrap();
        assert_eq!(json, "[]");
    }

    #[tokio::test]
    async fn test_corrupt_header_rejected() {
        let pages = pages();
        pages.put_page(0, &Page::from_bytes(b"not a database").unwrap()).await.unwrap();

        let err = load_image(&pages).await.unwrap_err();
        assert!(matches!(err, EngineError::CorruptImage { .. }));
    }

    #[test]
    fn test_blob_and_real_to_json() {
        assert_eq!(value_to_json(ValueRef::Blob(&[1, 2])), serde_json::json!([1, 2]));
        assert_eq!(value_to_json(ValueRef::Real(1.5)), serde_json::json!(1.5));
        assert_eq!(value_to_json(ValueRef::Real(f64::NAN)), serde_json::Value::Null);
    }
}
