//! List Controller
//!
//! Drives one list view: debounced search, owner and filters form the query
//! key; a key change discards the old list and restarts at page 1; the
//! sentinel pulls further pages while the user scrolls.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::Record;
use crate::error::Result;
use crate::sync::page::{FetchOutcome, FetchStatus, RefetchMode};
use crate::sync::{Debounced, InfiniteCache, OptimisticMutator, PageFetcher, QueryKey, ScrollSentinel};

/// Everything a list view renders
#[derive(Clone, Debug)]
pub struct ListView<R> {
    pub key: Option<QueryKey>,
    pub rows: Vec<R>,
    pub page_count: usize,
    pub status: FetchStatus,
    /// Last fetch error, shown as a banner until a fetch succeeds
    pub error: Option<String>,
    pub has_next: bool,
    /// Search input has changed but not yet been applied
    pub search_settling: bool,
}

impl<R> ListView<R> {
    /// Full-size spinner: nothing to show yet
    pub fn is_loading_first_page(&self) -> bool {
        self.status == FetchStatus::FetchingFirstPage
    }

    /// Inline spinner under the last row
    pub fn is_loading_next_page(&self) -> bool {
        self.status == FetchStatus::FetchingNextPage
    }

    /// A completed fetch returned no records at all
    pub fn shows_empty_state(&self) -> bool {
        self.page_count > 0 && self.rows.is_empty() && self.status == FetchStatus::Idle
    }
}

/// Controller for one list view
pub struct ListController<F: PageFetcher> {
    cache: InfiniteCache<F>,
    owner: Option<String>,
    filters: BTreeMap<String, String>,
    search: Debounced<String>,
    search_rx: watch::Receiver<String>,
    active: Option<QueryKey>,
    sentinel: ScrollSentinel,
}

impl<F: PageFetcher> ListController<F> {
    /// Create a controller; must be called inside a tokio runtime
    pub fn new(cache: InfiniteCache<F>, search_debounce: Duration) -> Self {
        let search = Debounced::new(String::new(), search_debounce);
        let search_rx = search.subscribe();
        Self {
            cache,
            owner: None,
            filters: BTreeMap::new(),
            search,
            search_rx,
            active: None,
            sentinel: ScrollSentinel::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_filter(name, value);
        self
    }

    pub fn cache(&self) -> &InfiniteCache<F> {
        &self.cache
    }

    /// Mutator bound to this controller's cache
    ///
    /// Prefer the controller's own mutation methods, which also keep the
    /// scroll sentinel on the list's last row.
    pub fn mutator(&self) -> OptimisticMutator<F> {
        OptimisticMutator::new(self.cache.clone())
    }

    /// Key built from the published (debounced) search and the current filters
    pub fn current_key(&self) -> QueryKey {
        QueryKey::new(F::Record::KIND)
            .with_owner(self.owner.as_deref())
            .with_search(&self.search.current())
            .with_filters(self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Key of the list currently shown
    pub fn active_key(&self) -> Option<&QueryKey> {
        self.active.as_ref()
    }

    // ==================== Inputs ====================

    /// Raw search input; applied after the quiet period
    pub fn set_search(&self, text: &str) {
        self.search.set(text.to_string());
    }

    /// Set a filter; an empty value clears it
    pub fn set_filter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.filters.remove(&name);
        } else {
            self.filters.insert(name, value);
        }
    }

    pub fn clear_filter(&mut self, name: &str) {
        self.filters.remove(name);
    }

    pub fn set_owner(&mut self, owner: Option<&str>) {
        self.owner = owner.map(str::to_string);
    }

    // ==================== Sync ====================

    /// Apply the current key: on change, drop the old list and load page 1
    ///
    /// Returns `None` when the key is unchanged and already loaded.
    pub async fn sync(&mut self) -> Result<Option<FetchOutcome>> {
        let key = self.current_key();
        if self.active.as_ref() == Some(&key) && self.cache.contains(&key) {
            return Ok(None);
        }

        if let Some(old) = self.active.replace(key.clone()) {
            if old != key {
                info!(from = %old, to = %key, "query key changed, resetting list");
                self.cache.remove(&old);
            }
        }

        self.sentinel.disconnect();
        let outcome = self.cache.fetch_first_page(&key).await;
        self.sentinel.observe(self.cache.rows(&key).len());
        outcome.map(Some)
    }

    /// Wait for the next debounced search value, then apply it
    ///
    /// When the raw input already equals the published value there is nothing
    /// left to publish, so the current key is applied without waiting.
    pub async fn search_settled(&mut self) -> Result<Option<FetchOutcome>> {
        if !self.search.is_settling() {
            self.search_rx.mark_unchanged();
            return self.sync().await;
        }
        if self.search_rx.changed().await.is_err() {
            return Ok(None);
        }
        self.sync().await
    }

    /// Visibility event for a rendered row
    pub async fn on_row_visible(&mut self, row: usize) -> Result<Option<FetchOutcome>> {
        let Some(key) = self.active.clone() else {
            return Ok(None);
        };
        self.sentinel.on_row_visible(row, &self.cache, &key).await
    }

    /// Manual refresh (also the retry action after an error)
    pub async fn refresh(&mut self, mode: RefetchMode) -> Result<Option<FetchOutcome>> {
        let Some(key) = self.active.clone() else {
            return self.sync().await;
        };
        let outcome = self.cache.refetch(&key, mode).await;
        self.sentinel.observe(self.cache.rows(&key).len());
        outcome.map(Some)
    }

    /// Full refetch if the list was invalidated since it was loaded
    pub async fn refresh_if_stale(&mut self) -> Result<Option<FetchOutcome>> {
        let stale = self
            .active
            .as_ref()
            .is_some_and(|key| self.cache.is_stale(key));
        if !stale {
            return Ok(None);
        }
        self.refresh(RefetchMode::AllPages).await
    }

    /// The view became visible again (tab/window focus); reconcile with the backend
    pub async fn on_visibility_regained(&mut self) -> Result<Option<FetchOutcome>> {
        if self.active.is_none() {
            return Ok(None);
        }
        self.refresh(RefetchMode::AllPages).await
    }

    // ==================== Mutations ====================

    /// Key a mutation result is patched into: the list on screen, or the one
    /// the next sync will load
    pub fn target_key(&self) -> QueryKey {
        self.active.clone().unwrap_or_else(|| self.current_key())
    }

    /// Run a delete, then drop record `id` from the list
    pub async fn remove<T, Fut>(&mut self, id: &str, mutation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let key = self.target_key();
        let value = self.mutator().remove(&key, id, mutation).await?;
        self.reattach().await;
        Ok(value)
    }

    /// Run an update, then apply `patch` to record `id` with its result
    pub async fn update<T, Fut, P>(&mut self, id: &str, mutation: Fut, patch: P) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
        P: FnOnce(&mut F::Record, &T),
    {
        let key = self.target_key();
        self.mutator().update(&key, id, mutation, patch).await
    }

    /// Run an update, then replace record `id` with the returned record
    pub async fn replace<Fut>(&mut self, id: &str, mutation: Fut) -> Result<F::Record>
    where
        Fut: Future<Output = Result<F::Record>>,
    {
        let key = self.target_key();
        self.mutator().replace(&key, id, mutation).await
    }

    /// Run a create, then show the created record first
    pub async fn prepend<Fut>(&mut self, mutation: Fut) -> Result<F::Record>
    where
        Fut: Future<Output = Result<F::Record>>,
    {
        let key = self.target_key();
        let record = self.mutator().prepend(&key, mutation).await?;
        self.reattach().await;
        Ok(record)
    }

    /// Move the sentinel to the last row after the row count changed locally
    ///
    /// A list emptied by removals while more pages exist has no row left to
    /// scroll to, so pages are pulled until a row shows up or the list ends.
    async fn reattach(&mut self) {
        let Some(key) = self.active.clone() else {
            return;
        };
        while self.cache.rows(&key).is_empty() && self.cache.has_next_page(&key) {
            match self.cache.fetch_next_page(&key).await {
                Ok(FetchOutcome::Loaded { .. }) => {}
                Ok(_) => break,
                Err(err) => {
                    warn!(%key, error = %err, "loading more rows after removal failed");
                    break;
                }
            }
        }
        self.sentinel.observe(self.cache.rows(&key).len());
    }

    pub fn view(&self) -> ListView<F::Record> {
        let search_settling = self.search.is_settling();
        let snapshot = self.active.as_ref().and_then(|key| self.cache.snapshot(key));
        match snapshot {
            Some(snapshot) => ListView {
                key: Some(snapshot.key),
                rows: snapshot.rows,
                page_count: snapshot.page_count,
                status: snapshot.status,
                error: snapshot.last_error,
                has_next: snapshot.has_next,
                search_settling,
            },
            None => ListView {
                key: self.active.clone(),
                rows: Vec::new(),
                page_count: 0,
                status: FetchStatus::Idle,
                error: None,
                has_next: false,
                search_settling,
            },
        }
    }
}

impl<F: PageFetcher> Drop for ListController<F> {
    fn drop(&mut self) {
        self.sentinel.disconnect();
        if let Some(key) = self.active.take() {
            self.cache.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::{Instant, sleep};

    use super::*;
    use crate::sync::CacheOptions;
    use crate::sync::testing::{MemoryBackend, Row};

    const QUIET: Duration = Duration::from_millis(300);

    fn controller(rows: Vec<Row>) -> (Arc<MemoryBackend>, ListController<MemoryBackend>) {
        let backend = MemoryBackend::with_rows(rows);
        let cache = InfiniteCache::new(backend.clone(), CacheOptions::default());
        (backend, ListController::new(cache, QUIET))
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_triggers_one_fetch() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("initial load");

        list.set_search("ann");
        sleep(Duration::from_millis(100)).await;
        list.set_search("anna");
        let last_keystroke = Instant::now();
        assert!(list.view().search_settling);

        list.search_settled().await.expect("settled");

        assert!(last_keystroke.elapsed() >= QUIET);
        assert_eq!(backend.searches_requested(), vec!["", "anna"]);
        assert_eq!(list.active_key().map(|k| k.search()), Some("anna"));
        assert!(!list.view().search_settling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_change_resets_to_first_page() {
        let mut rows = Row::range(0, 25);
        rows.extend((0..3).map(|i| Row::new(format!("anna-{i}"), format!("anna {i}"))));
        let (backend, mut list) = controller(rows);

        list.sync().await.expect("page 1");
        list.on_row_visible(9).await.expect("page 2");
        let old = list.active_key().cloned().expect("active");
        assert_eq!(list.view().rows.len(), 20);

        list.set_search("anna");
        list.search_settled().await.expect("settled");

        assert!(!list.cache().contains(&old));
        assert_eq!(backend.pages_requested(), vec![1, 2, 1]);
        let view = list.view();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.page_count, 1);
        assert!(!view.has_next);
    }

    #[tokio::test]
    async fn test_filter_and_owner_changes_reset() {
        let (backend, mut list) = controller(Row::range(0, 25));

        list.sync().await.expect("page 1");
        list.on_row_visible(9).await.expect("page 2");
        let first = list.active_key().cloned().expect("active");

        list.set_filter("status", "active");
        list.sync().await.expect("filtered");
        let second = list.active_key().cloned().expect("active");
        assert_ne!(first, second);
        assert!(!list.cache().contains(&first));

        list.set_owner(Some("agent-9"));
        list.sync().await.expect("owned");
        assert!(!list.cache().contains(&second));
        assert_eq!(list.active_key().and_then(|k| k.owner()), Some("agent-9"));

        assert_eq!(backend.pages_requested(), vec![1, 2, 1, 1]);
        assert_eq!(list.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_without_key_change_is_noop() {
        let (backend, mut list) = controller(Row::range(0, 25));

        assert!(list.sync().await.expect("load").is_some());
        assert!(list.sync().await.expect("noop").is_none());

        // Setting a filter back to its previous state keeps the key
        list.set_filter("status", "");
        assert!(list.sync().await.expect("noop").is_none());
        assert_eq!(backend.pages_requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_invalidated_list_refreshes_all_pages() {
        let (backend, mut list) = controller(Row::range(0, 25));

        list.sync().await.expect("page 1");
        list.on_row_visible(9).await.expect("page 2");
        assert!(list.refresh_if_stale().await.expect("fresh").is_none());

        let key = list.active_key().cloned().expect("active");
        list.cache().invalidate(&key);
        list.refresh_if_stale().await.expect("refetch");

        assert_eq!(backend.pages_requested(), vec![1, 2, 1, 2]);
        assert!(!list.cache().is_stale(&key));
    }

    #[tokio::test]
    async fn test_visibility_regained_reconciles() {
        let (backend, mut list) = controller(Row::range(0, 25));
        assert!(list.on_visibility_regained().await.expect("nothing loaded").is_none());

        list.sync().await.expect("page 1");
        backend.delete("row-0");
        list.on_visibility_regained().await.expect("refetch");

        assert_eq!(list.view().rows.first().map(|r| r.id.as_str()), Some("row-1"));
    }

    #[tokio::test]
    async fn test_error_banner_and_retry() {
        let (backend, mut list) = controller(Row::range(0, 25));
        backend.fail_next("service unavailable");

        assert!(list.sync().await.is_err());
        let view = list.view();
        assert_eq!(view.status, FetchStatus::Error);
        assert!(view.error.as_deref().is_some_and(|e| e.contains("service unavailable")));
        assert!(!view.shows_empty_state());

        list.refresh(RefetchMode::FirstPage).await.expect("retry");
        let view = list.view();
        assert_eq!(view.error, None);
        assert_eq!(view.rows.len(), 10);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let (_backend, mut list) = controller(Vec::new());
        assert!(!list.view().shows_empty_state());

        list.sync().await.expect("load");
        assert!(list.view().shows_empty_state());
    }

    #[tokio::test]
    async fn test_scrolling_continues_after_delete() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("page 1");

        list.remove("row-3", async { Ok(()) }).await.expect("delete");
        let view = list.view();
        assert_eq!(view.rows.len(), 9);
        assert!(view.has_next);

        let outcome = list.on_row_visible(view.rows.len() - 1).await.expect("page 2");
        assert!(outcome.is_some_and(|o| o.is_loaded()));
        assert_eq!(backend.pages_requested(), vec![1, 2]);
        assert_eq!(list.view().rows.len(), 19);
    }

    #[tokio::test]
    async fn test_scrolling_continues_after_create() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("page 1");

        list.prepend(async { Ok(Row::new("row-new", "created")) })
            .await
            .expect("create");
        assert_eq!(list.view().rows.len(), 11);

        list.on_row_visible(10).await.expect("page 2");
        assert_eq!(backend.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_emptied_list_loads_following_page() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("page 1");

        for i in 0..10 {
            list.remove(&format!("row-{i}"), async { Ok(()) }).await.expect("delete");
        }

        let view = list.view();
        assert_eq!(view.rows, Row::range(10, 20));
        assert_eq!(backend.pages_requested(), vec![1, 2]);

        list.on_row_visible(9).await.expect("page 3");
        assert_eq!(backend.pages_requested(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_rows() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("page 1");

        let result: Result<()> = list
            .remove("row-3", async {
                Err(crate::error::Error::Api {
                    status: 403,
                    message: "forbidden".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(list.view().rows, Row::range(0, 10));
        assert_eq!(backend.pages_requested(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_back_to_published_value_does_not_wait() {
        let (backend, mut list) = controller(Row::range(0, 25));
        list.sync().await.expect("initial load");

        list.set_search("ann");
        list.search_settled().await.expect("settled");

        list.set_search("anna");
        list.set_search("ann");
        let outcome = tokio::time::timeout(Duration::from_secs(5), list.search_settled())
            .await
            .expect("returns without a publish")
            .expect("sync");

        assert_eq!(outcome, None);
        assert_eq!(backend.searches_requested(), vec!["", "ann"]);
    }

    #[tokio::test]
    async fn test_drop_discards_list() {
        let (_backend, mut list) = controller(Row::range(0, 5));
        list.sync().await.expect("load");
        let cache = list.cache().clone();
        let key = list.active_key().cloned().expect("active");

        drop(list);
        assert!(!cache.contains(&key));
    }
}
