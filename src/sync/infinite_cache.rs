//! Infinite Cache
//!
//! Owns the ordered pages of every query key for one record type, plus the
//! derived "has more" and "is fetching" state.
//!
//! ## Request tickets
//!
//! Every request is issued under a ticket stored on its list entry. A first
//! page fetch or refetch replaces the ticket, removal or eviction drops the
//! entry. A response whose ticket is no longer current is discarded, so a
//! slow answer for a superseded list never lands in the newer one.
//!
//! ```text
//! fetch_first_page(A) ──ticket 7──▶ backend ····slow····▶ response(7)
//! remove(A) / fetch_first_page(A) ──ticket 8──▶ ...          │
//!                                                  7 ≠ current ─▶ dropped
//! ```
//!
//! The store lock is never held across an await.

use std::sync::Arc;

use ahash::{AHashSet, RandomState};
use crossbeam_channel::Sender;
use hashlink::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_CACHED_LISTS};
use crate::domain::{ListConfig, Record};
use crate::error::Result;
use crate::sync::page::{FetchOutcome, FetchStatus, Page, RefetchMode, flatten};
use crate::sync::{PageFetcher, PageRequest, QueryKey, SyncEvent};

/// Sizing of an infinite cache
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    /// Records requested per page
    pub page_size: u32,
    /// Lists retained before the least recently used one is evicted
    pub max_lists: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_lists: MAX_CACHED_LISTS,
        }
    }
}

impl CacheOptions {
    pub fn from_config(lists: &ListConfig) -> Self {
        Self {
            page_size: lists.page_size.max(1),
            max_lists: lists.max_cached_lists.max(1),
        }
    }
}

/// Read-only view of one list
#[derive(Clone, Debug)]
pub struct ListSnapshot<R> {
    pub key: QueryKey,
    /// All pages flattened in fetch order
    pub rows: Vec<R>,
    pub page_count: usize,
    pub status: FetchStatus,
    pub last_error: Option<String>,
    pub has_next: bool,
    pub stale: bool,
}

impl<R> ListSnapshot<R> {
    /// A completed load that produced no records at all
    pub fn is_empty_result(&self) -> bool {
        self.page_count > 0 && self.rows.is_empty() && self.status == FetchStatus::Idle
    }
}

struct ListEntry<R> {
    pages: Vec<Page<R>>,
    status: FetchStatus,
    last_error: Option<String>,
    in_flight: Option<u64>,
    stale: bool,
    /// Ids removed locally; filtered out of every page that arrives later
    tombstones: AHashSet<String>,
}

impl<R: Record> ListEntry<R> {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            status: FetchStatus::Idle,
            last_error: None,
            in_flight: None,
            stale: false,
            tombstones: AHashSet::new(),
        }
    }

    fn has_next(&self, page_size: u32) -> bool {
        self.pages.last().is_some_and(|page| page.is_full(page_size))
    }

    fn admit(&self, mut page: Page<R>) -> Page<R> {
        if !self.tombstones.is_empty() {
            page.records_mut()
                .retain(|record| !self.tombstones.contains(record.record_id()));
        }
        page
    }

    fn snapshot(&self, key: &QueryKey, page_size: u32) -> ListSnapshot<R> {
        ListSnapshot {
            key: key.clone(),
            rows: flatten(&self.pages),
            page_count: self.pages.len(),
            status: self.status,
            last_error: self.last_error.clone(),
            has_next: self.has_next(page_size),
            stale: self.stale,
        }
    }
}

struct Store<R> {
    lists: LruCache<QueryKey, ListEntry<R>, RandomState>,
    next_ticket: u64,
}

impl<R: Record> Store<R> {
    fn new(capacity: usize) -> Self {
        Self {
            lists: LruCache::with_hasher(capacity, RandomState::new()),
            next_ticket: 0,
        }
    }

    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn is_current(&mut self, key: &QueryKey, ticket: u64) -> bool {
        self.lists
            .get_mut(key)
            .is_some_and(|entry| entry.in_flight == Some(ticket))
    }

    /// Run `f` on the entry for `key`, creating it when missing.
    /// Returns the key evicted to make room, if any.
    fn with_entry<T>(
        &mut self,
        key: &QueryKey,
        f: impl FnOnce(&mut ListEntry<R>) -> T,
    ) -> (T, Option<QueryKey>) {
        if let Some(entry) = self.lists.get_mut(key) {
            return (f(entry), None);
        }

        let mut entry = ListEntry::new();
        let out = f(&mut entry);
        let evicted = if self.lists.len() >= self.lists.capacity() {
            self.lists.remove_lru().map(|(evicted, _)| evicted)
        } else {
            None
        };
        self.lists.insert(key.clone(), entry);
        (out, evicted)
    }
}

/// Releases a request ticket if its fetch future is dropped before completing
///
/// The entry goes back to `Idle` (or `Error` if the last fetch failed) so the
/// next fetch is not refused as in flight.
struct TicketGuard<'a, R: Record> {
    store: &'a Mutex<Store<R>>,
    key: &'a QueryKey,
    ticket: u64,
    armed: bool,
}

impl<'a, R: Record> TicketGuard<'a, R> {
    fn new(store: &'a Mutex<Store<R>>, key: &'a QueryKey, ticket: u64) -> Self {
        Self {
            store,
            key,
            ticket,
            armed: true,
        }
    }

    /// The response is about to be completed normally
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<R: Record> Drop for TicketGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut store = self.store.lock();
        if let Some(entry) = store.lists.get_mut(self.key) {
            if entry.in_flight == Some(self.ticket) {
                entry.in_flight = None;
                entry.status = if entry.last_error.is_some() {
                    FetchStatus::Error
                } else {
                    FetchStatus::Idle
                };
                debug!(key = %self.key, ticket = self.ticket, "fetch cancelled, ticket released");
            }
        }
    }
}

enum NextStep {
    Start { ticket: u64, page: u32 },
    FirstPage,
    InFlight,
    Exhausted,
}

/// Paged list cache for one record type
pub struct InfiniteCache<F: PageFetcher> {
    fetcher: Arc<F>,
    store: Arc<Mutex<Store<F::Record>>>,
    options: CacheOptions,
    events: Option<Sender<SyncEvent>>,
}

impl<F: PageFetcher> Clone for InfiniteCache<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            options: self.options,
            events: self.events.clone(),
        }
    }
}

impl<F: PageFetcher> InfiniteCache<F> {
    /// Create an empty cache backed by `fetcher`
    pub fn new(fetcher: Arc<F>, options: CacheOptions) -> Self {
        Self {
            fetcher,
            store: Arc::new(Mutex::new(Store::new(options.max_lists.max(1)))),
            options,
            events: None,
        }
    }

    /// Emit sync events on `tx`
    pub fn with_events(mut self, tx: Sender<SyncEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    pub fn page_size(&self) -> u32 {
        self.options.page_size
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn emit_evicted(&self, evicted: Option<QueryKey>) {
        if let Some(key) = evicted {
            info!(%key, "list evicted from cache");
            self.emit(SyncEvent::Evicted { key });
        }
    }

    fn request(&self, key: &QueryKey, page: u32) -> PageRequest {
        PageRequest::new(key.clone(), page, self.options.page_size)
    }

    /// Mark a new reset-style request on the entry and return its ticket
    fn begin_reset(&self, key: &QueryKey, status: FetchStatus, mode: RefetchMode) -> (u64, u32) {
        let (ticket, pages, evicted) = {
            let mut store = self.store.lock();
            let ticket = store.ticket();
            let (pages, evicted) = store.with_entry(key, |entry| {
                entry.in_flight = Some(ticket);
                entry.status = status;
                match mode {
                    RefetchMode::FirstPage => 1,
                    RefetchMode::AllPages => entry.pages.len().max(1) as u32,
                }
            });
            (ticket, pages, evicted)
        };
        self.emit_evicted(evicted);
        (ticket, pages)
    }

    /// Store a response if its ticket is still current
    fn complete(
        &self,
        key: &QueryKey,
        ticket: u64,
        page_no: u32,
        result: Result<Vec<Page<F::Record>>>,
        append: bool,
    ) -> Result<FetchOutcome> {
        let page_size = self.options.page_size;

        let (outcome, event) = {
            let mut store = self.store.lock();
            match store.lists.get_mut(key) {
                Some(entry) if entry.in_flight == Some(ticket) => {
                    entry.in_flight = None;
                    match result {
                        Ok(pages) => {
                            let pages: Vec<_> =
                                pages.into_iter().map(|page| entry.admit(page)).collect();
                            let len = pages.last().map_or(0, |page| page.fetched_len());
                            if append {
                                entry.pages.extend(pages);
                            } else {
                                entry.pages = pages;
                                entry.stale = false;
                            }
                            entry.status = FetchStatus::Idle;
                            entry.last_error = None;
                            let has_next = entry.has_next(page_size);

                            debug!(%key, page = page_no, len, has_next, "page stored");
                            (
                                Ok(FetchOutcome::Loaded {
                                    page: page_no,
                                    len,
                                    has_next,
                                }),
                                SyncEvent::PageLoaded {
                                    key: key.clone(),
                                    page: page_no,
                                    len,
                                    has_next,
                                },
                            )
                        }
                        Err(err) => {
                            let message = err.to_string();
                            warn!(%key, page = page_no, error = %message, "page fetch failed");
                            entry.status = FetchStatus::Error;
                            entry.last_error = Some(message.clone());
                            (
                                Err(err),
                                SyncEvent::FetchFailed {
                                    key: key.clone(),
                                    page: page_no,
                                    message,
                                },
                            )
                        }
                    }
                }
                _ => {
                    debug!(%key, page = page_no, ticket, "discarding stale response");
                    (
                        Ok(FetchOutcome::Stale { page: page_no }),
                        SyncEvent::StaleDiscarded {
                            key: key.clone(),
                            page: page_no,
                        },
                    )
                }
            }
        };

        self.emit(event);
        outcome
    }

    // ==================== Fetching ====================

    /// Fetch page 1, replacing whatever is stored for `key`
    ///
    /// Supersedes any request already in flight for the key.
    pub async fn fetch_first_page(&self, key: &QueryKey) -> Result<FetchOutcome> {
        let (ticket, _) = self.begin_reset(key, FetchStatus::FetchingFirstPage, RefetchMode::FirstPage);
        debug!(%key, ticket, "fetching first page");

        let guard = TicketGuard::new(&self.store, key, ticket);
        let result = self.fetcher.fetch_page(self.request(key, 1)).await;
        guard.disarm();
        let pages = result.map(|records| vec![Page::new(1, records)]);
        self.complete(key, ticket, 1, pages, false)
    }

    /// Fetch page `pages.len() + 1` and append it
    ///
    /// Returns [`FetchOutcome::InFlight`] while another request for the key is
    /// outstanding and [`FetchOutcome::Exhausted`] once the last page was short.
    /// With nothing loaded yet this is a first page fetch.
    pub async fn fetch_next_page(&self, key: &QueryKey) -> Result<FetchOutcome> {
        let page_size = self.options.page_size;
        let (step, evicted) = {
            let mut store = self.store.lock();
            let ticket = store.ticket();
            store.with_entry(key, |entry| {
                if entry.in_flight.is_some() {
                    NextStep::InFlight
                } else if entry.pages.is_empty() {
                    NextStep::FirstPage
                } else if !entry.has_next(page_size) {
                    NextStep::Exhausted
                } else {
                    entry.in_flight = Some(ticket);
                    entry.status = FetchStatus::FetchingNextPage;
                    NextStep::Start {
                        ticket,
                        page: entry.pages.len() as u32 + 1,
                    }
                }
            })
        };
        self.emit_evicted(evicted);

        match step {
            NextStep::InFlight => Ok(FetchOutcome::InFlight),
            NextStep::Exhausted => Ok(FetchOutcome::Exhausted),
            NextStep::FirstPage => self.fetch_first_page(key).await,
            NextStep::Start { ticket, page } => {
                debug!(%key, page, ticket, "fetching next page");
                let guard = TicketGuard::new(&self.store, key, ticket);
                let result = self.fetcher.fetch_page(self.request(key, page)).await;
                guard.disarm();
                let pages = result.map(|records| vec![Page::new(page, records)]);
                self.complete(key, ticket, page, pages, true)
            }
        }
    }

    /// Re-fetch page 1 only, or every loaded page
    ///
    /// Stored pages stay visible until the whole refetch succeeds; a short
    /// page ends a full refetch early.
    pub async fn refetch(&self, key: &QueryKey, mode: RefetchMode) -> Result<FetchOutcome> {
        let (ticket, count) = self.begin_reset(key, FetchStatus::Refetching, mode);
        info!(%key, ?mode, pages = count, "refetching list");

        let guard = TicketGuard::new(&self.store, key, ticket);
        let mut pages = Vec::with_capacity(count as usize);
        for number in 1..=count {
            match self.fetcher.fetch_page(self.request(key, number)).await {
                Ok(records) => {
                    let page = Page::new(number, records);
                    let full = page.is_full(self.options.page_size);
                    pages.push(page);
                    if !full || !self.store.lock().is_current(key, ticket) {
                        break;
                    }
                }
                Err(err) => {
                    guard.disarm();
                    return self.complete(key, ticket, number, Err(err), false);
                }
            }
        }
        guard.disarm();

        let last = pages.last().map_or(1, |page| page.number());
        self.complete(key, ticket, last, Ok(pages), false)
    }

    // ==================== Local patches ====================

    /// Transform the stored pages of `key` without a network round trip
    ///
    /// A missing entry is created empty first, so a later load proceeds normally.
    pub fn patch<T>(&self, key: &QueryKey, f: impl FnOnce(&mut Vec<Page<F::Record>>) -> T) -> T {
        let (out, evicted) = self.store.lock().with_entry(key, |entry| f(&mut entry.pages));
        self.emit_evicted(evicted);
        self.emit(SyncEvent::Patched { key: key.clone() });
        out
    }

    /// Remove a record from every page of `key`
    ///
    /// The id is remembered for the lifetime of the entry, so a page already
    /// in flight cannot bring the record back.
    pub fn remove_record(&self, key: &QueryKey, id: &str) -> bool {
        let (removed, evicted) = self.store.lock().with_entry(key, |entry| {
            entry.tombstones.insert(id.to_string());
            entry
                .pages
                .iter_mut()
                .fold(false, |removed, page| page.remove(id) || removed)
        });
        self.emit_evicted(evicted);
        self.emit(SyncEvent::Patched { key: key.clone() });
        removed
    }

    /// Apply `f` to the record with `id` in `key`'s pages
    pub fn update_record(&self, key: &QueryKey, id: &str, f: impl FnOnce(&mut F::Record)) -> bool {
        self.patch(key, |pages| {
            match pages.iter_mut().find_map(|page| page.find_mut(id)) {
                Some(record) => {
                    f(record);
                    true
                }
                None => false,
            }
        })
    }

    /// Insert a record at the top of page 1
    ///
    /// Nothing is inserted while the list is not loaded; its first fetch will
    /// include the record.
    pub fn prepend_record(&self, key: &QueryKey, record: F::Record) -> bool {
        self.patch(key, |pages| match pages.first_mut() {
            Some(first) => {
                first.records_mut().insert(0, record);
                true
            }
            None => false,
        })
    }

    /// Mark `key` for a full refetch on its next refresh
    pub fn invalidate(&self, key: &QueryKey) {
        let marked = self
            .store
            .lock()
            .lists
            .get_mut(key)
            .map(|entry| entry.stale = true)
            .is_some();
        if marked {
            self.emit(SyncEvent::Invalidated { key: key.clone() });
        }
    }

    /// Mark every cached list stale
    pub fn invalidate_all(&self) {
        let keys: Vec<QueryKey> = {
            let mut store = self.store.lock();
            store
                .lists
                .iter_mut()
                .map(|(key, entry)| {
                    entry.stale = true;
                    key.clone()
                })
                .collect()
        };
        for key in keys {
            self.emit(SyncEvent::Invalidated { key });
        }
    }

    /// Discard the pages of `key`; a request in flight for it becomes stale
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.store.lock().lists.remove(key).is_some();
        if removed {
            debug!(%key, "list removed");
            self.emit(SyncEvent::Removed { key: key.clone() });
        }
        removed
    }

    // ==================== Reads ====================

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.store.lock().lists.contains_key(key)
    }

    /// Number of lists currently cached
    pub fn len(&self) -> usize {
        self.store.lock().lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<ListSnapshot<F::Record>> {
        let page_size = self.options.page_size;
        self.store
            .lock()
            .lists
            .get_mut(key)
            .map(|entry| entry.snapshot(key, page_size))
    }

    /// Stored pages of `key`, in fetch order
    pub fn pages(&self, key: &QueryKey) -> Vec<Page<F::Record>> {
        self.store
            .lock()
            .lists
            .get_mut(key)
            .map(|entry| entry.pages.clone())
            .unwrap_or_default()
    }

    /// All records of `key` flattened in fetch order
    pub fn rows(&self, key: &QueryKey) -> Vec<F::Record> {
        self.store
            .lock()
            .lists
            .get_mut(key)
            .map(|entry| flatten(&entry.pages))
            .unwrap_or_default()
    }

    pub fn status(&self, key: &QueryKey) -> FetchStatus {
        self.store
            .lock()
            .lists
            .get_mut(key)
            .map_or(FetchStatus::Idle, |entry| entry.status)
    }

    /// Message of the last failed fetch, until a fetch succeeds
    pub fn last_error(&self, key: &QueryKey) -> Option<String> {
        self.store
            .lock()
            .lists
            .get_mut(key)
            .and_then(|entry| entry.last_error.clone())
    }

    /// True iff the last stored page is full
    pub fn has_next_page(&self, key: &QueryKey) -> bool {
        let page_size = self.options.page_size;
        self.store
            .lock()
            .lists
            .get_mut(key)
            .is_some_and(|entry| entry.has_next(page_size))
    }

    pub fn is_fetching_next_page(&self, key: &QueryKey) -> bool {
        self.status(key) == FetchStatus::FetchingNextPage
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.store
            .lock()
            .lists
            .get_mut(key)
            .is_some_and(|entry| entry.stale)
    }
}

impl<F: PageFetcher> std::fmt::Debug for InfiniteCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfiniteCache")
            .field("options", &self.options)
            .field("lists", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::domain::EntityKind;
    use crate::error::Error;
    use crate::sync::testing::{MemoryBackend, Row};

    fn key(search: &str) -> QueryKey {
        QueryKey::new(EntityKind::Clients).with_search(search)
    }

    fn cache(backend: &Arc<MemoryBackend>) -> InfiniteCache<MemoryBackend> {
        InfiniteCache::new(backend.clone(), CacheOptions::default())
    }

    async fn wait_for_calls(backend: &MemoryBackend, count: usize) {
        while backend.calls().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_twenty_five_records_in_three_pages() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        let first = cache.fetch_first_page(&k).await.expect("page 1");
        assert_eq!(first, FetchOutcome::Loaded { page: 1, len: 10, has_next: true });
        let second = cache.fetch_next_page(&k).await.expect("page 2");
        assert_eq!(second, FetchOutcome::Loaded { page: 2, len: 10, has_next: true });
        let third = cache.fetch_next_page(&k).await.expect("page 3");
        assert_eq!(third, FetchOutcome::Loaded { page: 3, len: 5, has_next: false });

        assert!(!cache.has_next_page(&k));
        assert_eq!(cache.fetch_next_page(&k).await.expect("exhausted"), FetchOutcome::Exhausted);
        assert_eq!(backend.pages_requested(), vec![1, 2, 3]);

        let lens: Vec<_> = cache.pages(&k).iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![10, 10, 5]);
        assert_eq!(cache.rows(&k), Row::range(0, 25));
    }

    #[tokio::test]
    async fn test_page_numbers_are_contiguous_for_any_total() {
        for total in 0..=31 {
            let backend = MemoryBackend::with_rows(Row::range(0, total));
            let cache = cache(&backend);
            let k = key("");

            loop {
                match cache.fetch_next_page(&k).await.expect("fetch") {
                    FetchOutcome::Loaded { .. } => continue,
                    FetchOutcome::Exhausted => break,
                    other => panic!("unexpected outcome {other:?}"),
                }
            }

            let expected: Vec<u32> = (1..=backend.calls().len() as u32).collect();
            assert_eq!(backend.pages_requested(), expected, "total {total}");
            assert_eq!(cache.rows(&k).len(), total, "total {total}");
        }
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_page() {
        let backend = MemoryBackend::with_rows(Row::range(0, 20));
        let cache = cache(&backend);
        let k = key("");

        cache.fetch_first_page(&k).await.expect("page 1");
        cache.fetch_next_page(&k).await.expect("page 2");
        assert!(cache.has_next_page(&k));

        let last = cache.fetch_next_page(&k).await.expect("page 3");
        assert_eq!(last, FetchOutcome::Loaded { page: 3, len: 0, has_next: false });
        assert_eq!(cache.rows(&k).len(), 20);
    }

    #[tokio::test]
    async fn test_failure_keeps_pages_until_next_success() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        cache.fetch_first_page(&k).await.expect("page 1");
        backend.fail_next("backend down");

        let err = cache.fetch_next_page(&k).await.expect_err("page 2 fails");
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(cache.status(&k), FetchStatus::Error);
        assert_eq!(cache.rows(&k), Row::range(0, 10));
        assert!(cache.last_error(&k).is_some_and(|m| m.contains("backend down")));

        // Retry asks for the same page again
        cache.fetch_next_page(&k).await.expect("retry");
        assert_eq!(backend.pages_requested(), vec![1, 2, 2]);
        assert_eq!(cache.status(&k), FetchStatus::Idle);
        assert_eq!(cache.last_error(&k), None);
        assert_eq!(cache.rows(&k), Row::range(0, 20));
    }

    #[tokio::test]
    async fn test_response_for_removed_list_is_discarded() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let (tx, rx) = crossbeam_channel::unbounded();
        let cache = cache.with_events(tx);
        let old = key("ann");

        let pending = tokio::spawn({
            let cache = cache.clone();
            let old = old.clone();
            async move { cache.fetch_first_page(&old).await }
        });
        wait_for_calls(&backend, 1).await;

        assert!(cache.remove(&old));
        backend.release(1);

        let outcome = pending.await.expect("join").expect("fetch");
        assert_eq!(outcome, FetchOutcome::Stale { page: 1 });
        assert!(!cache.contains(&old));
        assert!(rx.try_iter().any(|e| matches!(e, SyncEvent::StaleDiscarded { .. })));
    }

    #[tokio::test]
    async fn test_superseded_first_page_is_discarded() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        let slow = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.fetch_first_page(&k).await }
        });
        wait_for_calls(&backend, 1).await;

        let fresh = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.fetch_first_page(&k).await }
        });
        wait_for_calls(&backend, 2).await;

        backend.release(2);
        let outcomes = [
            slow.await.expect("join").expect("slow"),
            fresh.await.expect("join").expect("fresh"),
        ];

        assert_eq!(outcomes[0], FetchOutcome::Stale { page: 1 });
        assert!(outcomes[1].is_loaded());
        assert_eq!(cache.pages(&k).len(), 1);
    }

    #[tokio::test]
    async fn test_next_page_refused_while_in_flight() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        backend.release(1);
        cache.fetch_first_page(&k).await.expect("page 1");

        let pending = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.fetch_next_page(&k).await }
        });
        wait_for_calls(&backend, 2).await;

        assert!(cache.is_fetching_next_page(&k));
        assert_eq!(cache.fetch_next_page(&k).await.expect("guard"), FetchOutcome::InFlight);

        backend.release(1);
        pending.await.expect("join").expect("page 2");
        assert_eq!(backend.pages_requested(), vec![1, 2]);
        assert!(!cache.is_fetching_next_page(&k));
    }

    #[tokio::test]
    async fn test_removed_record_not_resurrected_by_inflight_page() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        backend.release(1);
        cache.fetch_first_page(&k).await.expect("page 1");

        let pending = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.fetch_next_page(&k).await }
        });
        wait_for_calls(&backend, 2).await;

        // Page 2 was computed before the delete reached the backend
        backend.delete("row-12");
        assert!(!cache.remove_record(&k, "row-12"));

        backend.release(1);
        let outcome = pending.await.expect("join").expect("page 2");
        assert_eq!(outcome, FetchOutcome::Loaded { page: 2, len: 10, has_next: true });

        let rows = cache.rows(&k);
        assert_eq!(rows.len(), 19);
        assert!(rows.iter().all(|r| r.id != "row-12"));
    }

    #[tokio::test]
    async fn test_patch_leaves_other_keys_untouched() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let a = key("");
        let b = QueryKey::new(EntityKind::Clients).with_filter("status", "active");

        cache.fetch_first_page(&a).await.expect("a");
        cache.fetch_first_page(&b).await.expect("b");
        cache.fetch_next_page(&b).await.expect("b2");
        let before = cache.pages(&b);

        assert!(cache.remove_record(&a, "row-3"));
        assert!(cache.update_record(&a, "row-4", |r| r.name = "renamed".into()));

        assert_eq!(cache.pages(&b), before);
        assert_eq!(cache.rows(&a).len(), 9);
        assert!(cache.rows(&a).iter().any(|r| r.name == "renamed"));
    }

    #[tokio::test]
    async fn test_patch_on_unknown_key_creates_empty_entry() {
        let backend = MemoryBackend::with_rows(Row::range(0, 5));
        let cache = cache(&backend);
        let k = key("");

        assert!(!cache.remove_record(&k, "row-1"));
        assert!(!cache.prepend_record(&k, Row::new("new", "fresh")));
        assert!(cache.contains(&k));
        assert!(cache.pages(&k).is_empty());

        // A later load proceeds normally, without the removed record
        let outcome = cache.fetch_next_page(&k).await.expect("load");
        assert_eq!(outcome, FetchOutcome::Loaded { page: 1, len: 5, has_next: false });
        assert_eq!(cache.rows(&k).len(), 4);
    }

    #[tokio::test]
    async fn test_full_refetch_replaces_loaded_pages() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        cache.fetch_first_page(&k).await.expect("page 1");
        cache.fetch_next_page(&k).await.expect("page 2");
        backend.delete("row-0");
        cache.invalidate(&k);
        assert!(cache.is_stale(&k));

        cache.refetch(&k, RefetchMode::AllPages).await.expect("refetch");
        assert_eq!(backend.pages_requested(), vec![1, 2, 1, 2]);
        assert_eq!(cache.rows(&k), Row::range(1, 21));
        assert!(!cache.is_stale(&k));

        cache.refetch(&k, RefetchMode::FirstPage).await.expect("light refetch");
        assert_eq!(cache.pages(&k).len(), 1);
        assert_eq!(cache.rows(&k), Row::range(1, 11));
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_pages() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        cache.fetch_first_page(&k).await.expect("page 1");
        cache.fetch_next_page(&k).await.expect("page 2");
        backend.fail_next("timeout");

        assert!(cache.refetch(&k, RefetchMode::AllPages).await.is_err());
        assert_eq!(cache.rows(&k), Row::range(0, 20));
        assert_eq!(cache.status(&k), FetchStatus::Error);
    }

    #[tokio::test]
    async fn test_least_recently_used_list_is_evicted() {
        let backend = MemoryBackend::with_rows(Row::range(0, 5));
        let (tx, rx) = crossbeam_channel::unbounded();
        let cache = InfiniteCache::new(
            backend.clone(),
            CacheOptions {
                page_size: 10,
                max_lists: 2,
            },
        )
        .with_events(tx);

        cache.fetch_first_page(&key("a")).await.expect("a");
        cache.fetch_first_page(&key("b")).await.expect("b");
        // Touch "a" so "b" becomes the oldest
        assert_eq!(cache.status(&key("a")), FetchStatus::Idle);
        cache.fetch_first_page(&key("c")).await.expect("c");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(rx.try_iter().any(|e| e == SyncEvent::Evicted { key: key("b") }));
    }

    #[tokio::test]
    async fn test_snapshot_reports_empty_result() {
        let backend = MemoryBackend::with_rows(Vec::new());
        let cache = cache(&backend);
        let k = key("nobody");

        cache.fetch_first_page(&k).await.expect("load");
        let snapshot = cache.snapshot(&k).expect("snapshot");
        assert!(snapshot.is_empty_result());
        assert!(!snapshot.has_next);
        assert_eq!(snapshot.page_count, 1);
    }

    #[tokio::test]
    async fn test_full_refetch_stops_at_short_page() {
        let backend = MemoryBackend::with_rows(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        for _ in 0..3 {
            cache.fetch_next_page(&k).await.expect("load");
        }
        for i in 0..6 {
            backend.delete(&format!("row-{i}"));
        }

        let outcome = cache.refetch(&k, RefetchMode::AllPages).await.expect("refetch");
        assert_eq!(outcome, FetchOutcome::Loaded { page: 2, len: 9, has_next: false });
        assert_eq!(backend.pages_requested(), vec![1, 2, 3, 1, 2]);
        assert_eq!(cache.pages(&k).len(), 2);
        assert_eq!(cache.rows(&k), Row::range(6, 25));
    }

    #[tokio::test]
    async fn test_refetch_superseded_between_pages_is_discarded() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        backend.release(2);
        cache.fetch_first_page(&k).await.expect("page 1");
        cache.fetch_next_page(&k).await.expect("page 2");

        let refetch = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.refetch(&k, RefetchMode::AllPages).await }
        });
        wait_for_calls(&backend, 3).await;

        let fresh = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move { cache.fetch_first_page(&k).await }
        });
        wait_for_calls(&backend, 4).await;

        // The refetch gets its first page back, sees it lost the ticket and stops
        backend.release(1);
        let outcome = refetch.await.expect("join").expect("refetch");
        assert_eq!(outcome, FetchOutcome::Stale { page: 1 });

        backend.release(1);
        assert!(fresh.await.expect("join").expect("fresh").is_loaded());
        assert_eq!(backend.pages_requested(), vec![1, 2, 1, 1]);
        assert_eq!(cache.pages(&k).len(), 1);
        assert_eq!(cache.status(&k), FetchStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_next_page_releases_the_list() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        backend.release(1);
        cache.fetch_first_page(&k).await.expect("page 1");

        let cancelled = timeout(Duration::from_millis(20), cache.fetch_next_page(&k)).await;
        assert!(cancelled.is_err());
        assert_eq!(cache.status(&k), FetchStatus::Idle);
        assert!(!cache.is_fetching_next_page(&k));

        backend.release(1);
        let outcome = cache.fetch_next_page(&k).await.expect("page 2");
        assert_eq!(outcome, FetchOutcome::Loaded { page: 2, len: 10, has_next: true });
        assert_eq!(backend.pages_requested(), vec![1, 2, 2]);
        assert_eq!(cache.rows(&k), Row::range(0, 20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_refetch_keeps_error_state() {
        let backend = MemoryBackend::gated(Row::range(0, 25));
        let cache = cache(&backend);
        let k = key("");

        backend.release(1);
        backend.fail_next("backend down");
        assert!(cache.fetch_first_page(&k).await.is_err());
        assert_eq!(cache.status(&k), FetchStatus::Error);

        let cancelled = timeout(
            Duration::from_millis(20),
            cache.refetch(&k, RefetchMode::FirstPage),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(cache.status(&k), FetchStatus::Error);
        assert!(cache.last_error(&k).is_some());

        backend.release(1);
        cache.refetch(&k, RefetchMode::FirstPage).await.expect("retry");
        assert_eq!(cache.status(&k), FetchStatus::Idle);
        assert_eq!(cache.rows(&k).len(), 10);
    }
}
