//! Page store: page-indexed view over a shard's durable key-value scope.
//!
//! Keys are the decimal string of the page index. Absence is a read-time
//! policy: a missing key reads as a zero page, and nothing is written until
//! the caller explicitly puts a page.

use std::sync::Arc;

use snafu::ResultExt;

use super::Page;
use super::PageError;
use super::PageIndex;
use super::ReadSnafu;
use super::WriteSnafu;
use crate::kv::DurableStore;

/// Maps page indices to pages for exactly one shard.
#[derive(Clone)]
pub struct PageStore {
    store: Arc<dyn DurableStore>,
}

impl PageStore {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Read page `ix`, or a zero page if it was never written.
    ///
    /// The returned page is an owned copy; mutating it does not affect stored
    /// state until it is passed back to [`PageStore::put_page`].
    pub async fn get_page(&self, ix: PageIndex) -> Result<Page, PageError> {
        let stored = self.store.get(&page_key(ix)).await.context(ReadSnafu { ix })?;
        let Some(bytes) = stored else {
            tracing::trace!(ix, "page absent, returning zero page");
            return Ok(Page::zeroed());
        };

        let (page, normalized) = Page::from_stored(&bytes);
        if normalized {
            tracing::warn!(ix, stored_len = bytes.len(), "stored page had unexpected length");
        }
        Ok(page)
    }

    /// Replace page `ix` wholesale. Durable once this returns.
    pub async fn put_page(&self, ix: PageIndex, page: &Page) -> Result<(), PageError> {
        tracing::trace!(ix, "writing page");
        self.store.put(&page_key(ix), page.as_bytes()).await.context(WriteSnafu { ix })
    }
}

impl std::fmt::Debug for PageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStore").finish_non_exhaustive()
    }
}

/// Durable key under which page `ix` is stored.
pub fn page_key(ix: PageIndex) -> String {
    ix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PAGE_SIZE;
    use crate::kv::InMemoryStore;

    #[tokio::test]
    async fn test_unwritten_page_is_zero() {
        let pages = PageStore::new(InMemoryStore::new());
        let page = pages.get_page(42).await.unwrap();
        assert_eq!(page.as_bytes().len(), PAGE_SIZE);
        assert!(page.is_zeroed());
    }

    #[tokio::test]
    async fn test_read_does_not_materialize() {
        let backing = InMemoryStore::new();
        let pages = PageStore::new(backing.clone());
        pages.get_page(0).await.unwrap();
        assert!(backing.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let pages = PageStore::new(InMemoryStore::new());
        let page = Page::from_bytes(b"SQLite format 3\0").unwrap();

        pages.put_page(1, &page).await.unwrap();
        assert_eq!(pages.get_page(1).await.unwrap(), page);
    }

    #[tokio::test]
    async fn test_returned_page_is_a_copy() {
        let pages = PageStore::new(InMemoryStore::new());
        pages.put_page(0, &Page::from_bytes(&[1]).unwrap()).await.unwrap();

        let mut copy = pages.get_page(0).await.unwrap();
        copy.as_mut_bytes()[0] = 99;

        assert_eq!(pages.get_page(0).await.unwrap().as_bytes()[0], 1);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let backing = InMemoryStore::new();
        let pages = PageStore::new(backing.clone());
        let page = Page::from_bytes(&[7; 16]).unwrap();

        pages.put_page(3, &page).await.unwrap();
        pages.put_page(3, &page).await.unwrap();

        assert_eq!(backing.len().await, 1);
        assert_eq!(pages.get_page(3).await.unwrap(), page);
    }

    #[tokio::test]
    async fn test_keys_are_decimal_strings() {
        let backing = InMemoryStore::new();
        let pages = PageStore::new(backing.clone());
        pages.put_page(1234, &Page::zeroed()).await.unwrap();

        assert!(backing.get("1234").await.unwrap().is_some());
        assert_eq!(page_key(u64::MAX), "18446744073709551615");
    }
}
