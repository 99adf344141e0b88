//! Fixed-size pages and the per-shard page store.
//!
//! A shard's storage is a logically infinite array of [`PAGE_SIZE`]-byte
//! pages. Pages that were never written read back as zeros; nothing is
//! materialized until an explicit write.

pub mod store;

use std::fmt;

use snafu::Snafu;

pub use self::store::PageStore;
use crate::constants::PAGE_SIZE;
use crate::kv::StoreError;

/// Non-negative page index within one shard.
pub type PageIndex = u64;

/// Errors raised by page operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PageError {
    #[snafu(display("page body of {size} bytes exceeds the {}-byte page size", PAGE_SIZE))]
    Oversized { size: usize },

    #[snafu(display("failed to read page {ix}: {source}"))]
    Read { ix: PageIndex, source: StoreError },

    #[snafu(display("failed to write page {ix}: {source}"))]
    Write { ix: PageIndex, source: StoreError },
}

/// One page of shard storage. Always exactly [`PAGE_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Page(Box<[u8; PAGE_SIZE]>);

impl Page {
    /// A zero-filled page, the value of every never-written index.
    pub fn zeroed() -> Self {
        Self(Box::new([0u8; PAGE_SIZE]))
    }

    /// Build a page from at most [`PAGE_SIZE`] bytes, zero-padding the tail.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PageError> {
        if bytes.len() > PAGE_SIZE {
            return Err(PageError::Oversized { size: bytes.len() });
        }
        let mut page = Self::zeroed();
        page.0[..bytes.len()].copy_from_slice(bytes);
        Ok(page)
    }

    /// Rebuild a page from a stored value, truncating or padding values of the
    /// wrong length. Returns the page and whether normalization was needed.
    pub(crate) fn from_stored(bytes: &[u8]) -> (Self, bool) {
        let len = bytes.len().min(PAGE_SIZE);
        let mut page = Self::zeroed();
        page.0[..len].copy_from_slice(&bytes[..len]);
        (page, bytes.len() != PAGE_SIZE)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }

    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl AsRef<[u8]> for Page {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.0.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
        write!(f, "Page({used} of {PAGE_SIZE} bytes used)")
    }
}
