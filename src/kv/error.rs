use snafu::Snafu;

/// Failures raised by a durable key-value backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("failed to open redb database at {path}: {source}"))]
    OpenDatabase {
        path: String,
        #[snafu(source(from(redb::DatabaseError, Box::new)))]
        source: Box<redb::DatabaseError>,
    },

    #[snafu(display("failed to begin redb transaction: {source}"))]
    BeginTransaction {
        #[snafu(source(from(redb::TransactionError, Box::new)))]
        source: Box<redb::TransactionError>,
    },

    #[snafu(display("failed to open table {table}: {source}"))]
    OpenTable {
        table: String,
        #[snafu(source(from(redb::TableError, Box::new)))]
        source: Box<redb::TableError>,
    },

    #[snafu(display("failed to commit write to {table}: {source}"))]
    Commit {
        table: String,
        #[snafu(source(from(redb::CommitError, Box::new)))]
        source: Box<redb::CommitError>,
    },

    #[snafu(display("storage error on key {key}: {source}"))]
    Storage {
        key: String,
        #[snafu(source(from(redb::StorageError, Box::new)))]
        source: Box<redb::StorageError>,
    },

    #[snafu(display("failed to create directory {path}: {source}"))]
    CreateDirectory { path: String, source: std::io::Error },

    #[snafu(display("storage task failed: {source}"))]
    Join { source: tokio::task::JoinError },
}
