//! Name-derived shard identities.
//!
//! A shard identity is the SHA-256 digest of the exact logical database name.
//! The derivation is:
//! - Pure: no registry lookup, no randomness
//! - Stable: the same name maps to the same id across processes and restarts
//! - Collision-resistant: distinct names never share storage in practice
//!
//! The registry still keys live shards by the exact name, so a digest
//! collision could never alias two in-memory handles.

use std::fmt;

use sha2::Digest;
use sha2::Sha256;

/// Length of a shard id in bytes.
pub const SHARD_ID_LEN: usize = 32;

/// Identity of one shard, derived from its logical database name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId([u8; SHARD_ID_LEN]);

impl ShardId {
    /// Derive the shard id for a logical database name.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; SHARD_ID_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Parse a 64-character hex id, as produced by `Display`.
    pub fn from_hex(hex_id: &str) -> Option<Self> {
        let decoded = hex::decode(hex_id).ok()?;
        let bytes: [u8; SHARD_ID_LEN] = decoded.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHARD_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardId({})", &hex::encode(self.0)[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(ShardId::from_name("orders"), ShardId::from_name("orders"));
    }

    #[test]
    fn test_distinct_names_distinct_ids() {
        assert_ne!(ShardId::from_name("orders"), ShardId::from_name("Orders"));
        assert_ne!(ShardId::from_name("a"), ShardId::from_name("a "));
    }

    #[test]
    fn test_known_digest() {
        // sha256("")
        assert_eq!(
            ShardId::from_name("").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let id = ShardId::from_name("inventory");
        assert_eq!(ShardId::from_hex(&id.to_string()), Some(id));
        assert_eq!(ShardId::from_hex("not-hex"), None);
        assert_eq!(ShardId::from_hex("abcd"), None);
    }

    #[test]
    fn test_display_is_64_lowercase_hex() {
        let shown = ShardId::from_name("x").to_string();
        assert_eq!(shown.len(), 64);
        assert!(shown.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
