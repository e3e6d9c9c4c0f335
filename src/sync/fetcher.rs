//! Paginated Fetcher
//!
//! Abstraction over the backend: one call returns one page of records for a
//! query key. Implementations must not touch any cache and must be callable
//! concurrently for different keys.

use futures::future::BoxFuture;

use crate::domain::Record;
use crate::error::Result;
use crate::sync::QueryKey;

/// Parameters of a single page request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub key: QueryKey,
    /// 1-based page number
    pub page: u32,
    /// Page size, fixed per list
    pub limit: u32,
}

impl PageRequest {
    pub fn new(key: QueryKey, page: u32, limit: u32) -> Self {
        debug_assert!(page >= 1, "pages are 1-based");
        Self { key, page, limit }
    }

    /// Query string pairs in the order the backend documents them:
    /// `ownerId`, `searchQuery`, filters, `page`, `limit`
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(owner) = self.key.owner() {
            pairs.push(("ownerId".to_string(), owner.to_string()));
        }
        if !self.key.search().is_empty() {
            pairs.push(("searchQuery".to_string(), self.key.search().to_string()));
        }
        for (name, value) in self.key.filters() {
            pairs.push((name.to_string(), value.to_string()));
        }
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }
}

/// Source of pages for one record type
pub trait PageFetcher: Send + Sync + 'static {
    type Record: Record;

    /// Fetch one page; the result holds between 0 and `request.limit` records
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Vec<Self::Record>>>;
}
