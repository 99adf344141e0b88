//! Name-to-shard resolution.
//!
//! - [`ShardId`]: deterministic identity derived from a logical database name
//! - [`ShardRegistry`]: creates shards lazily and hands out shared handles

pub mod registry;
pub mod shard_id;

pub use registry::ShardRegistry;
pub use shard_id::SHARD_ID_LEN;
pub use shard_id::ShardId;
