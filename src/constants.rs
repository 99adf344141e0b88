//! Fixed limits and well-known names shared across the proxy.
//!
//! Tiger Style: every size the proxy accepts is bounded by a constant here.

/// Size of one page in bytes. Every page read from a shard has exactly this length.
pub const PAGE_SIZE: usize = 4096;

/// Magic string at the start of every SQLite database image.
pub const SQLITE_HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Byte offset of the big-endian page size field in a SQLite header.
pub const SQLITE_HEADER_PAGE_SIZE_OFFSET: usize = 16;

/// Byte offset of the big-endian "database size in pages" field in a SQLite header.
pub const SQLITE_HEADER_PAGE_COUNT_OFFSET: usize = 28;

/// Largest database image the bundled engine will materialize (1 GiB).
pub const MAX_IMAGE_PAGES: u32 = 262_144;

/// Path prefix that marks a raw page read.
pub const GET_PAGE_MARKER: &str = "/get-page";

/// Path prefix that marks a raw page write.
pub const SET_PAGE_MARKER: &str = "/set-page";

/// Exact path that marks query mode.
pub const QUERY_MARKER: &str = "/query";

/// Query-string parameter carrying the page index.
pub const PAGE_INDEX_PARAM: &str = "ix";

/// Characters that separate statements in execute mode.
pub const STATEMENT_SEPARATOR: char = ';';

/// Default upper bound on an inbound request body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default HTTP port for the node.
pub const DEFAULT_HTTP_PORT: u16 = 8787;

/// File name of the redb database inside the data directory.
pub const REDB_FILE_NAME: &str = "pages.redb";

/// Prefix for per-shard redb table names.
pub const SHARD_TABLE_PREFIX: &str = "shard:";
