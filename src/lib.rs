//! shardlite: a sharded database proxy over per-shard page stores.
//!
//! Clients address a logical database by name. The router derives a stable
//! shard identity from the name and forwards the request to that shard, which
//! either reads or writes a raw 4096-byte page or runs SQL through a
//! page-oriented engine whose file system is the shard's page store.
//!
//! ```text
//! caller -> server (route) -> shard (validate) -> page store -> durable kv
//!                                              \-> sql engine -> page store
//! ```

pub mod config;
pub mod constants;
pub mod kv;
pub mod page;
pub mod server;
pub mod shard;
pub mod sharding;
pub mod sql;
