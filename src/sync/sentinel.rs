//! Scroll Sentinel
//!
//! Watches the last rendered row of a list. When that row becomes visible,
//! more pages exist and no next-page fetch is running, it asks the cache for
//! the next page, then moves to the new last row.
//!
//! ```text
//! NotObserving ──observe(n>0)──▶ Observing { row: n-1 }
//!      ▲                              │ row visible ∧ has_next ∧ ¬fetching
//!      │                              ▼
//!      └──disconnect()──────── fetch_next_page ──▶ Observing { row: new last }
//! ```

use tracing::debug;

use crate::error::Result;
use crate::sync::page::FetchOutcome;
use crate::sync::{InfiniteCache, PageFetcher, QueryKey};

/// Observation state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SentinelState {
    #[default]
    NotObserving,
    /// Attached to the row at this index
    Observing { row: usize },
}

/// Triggers next-page fetches from visibility of the last row
#[derive(Debug, Default)]
pub struct ScrollSentinel {
    state: SentinelState,
}

impl ScrollSentinel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SentinelState {
        self.state
    }

    /// Attach to the last of `row_count` rendered rows
    pub fn observe(&mut self, row_count: usize) {
        self.state = match row_count {
            0 => SentinelState::NotObserving,
            n => SentinelState::Observing { row: n - 1 },
        };
    }

    /// Stop observing (list unmounted or emptied)
    pub fn disconnect(&mut self) {
        self.state = SentinelState::NotObserving;
    }

    /// Whether a visibility event for `row` should fetch the next page
    pub fn should_trigger(&self, row: usize, has_next: bool, fetching_next: bool) -> bool {
        matches!(self.state, SentinelState::Observing { row: observed } if observed == row)
            && has_next
            && !fetching_next
    }

    /// Handle `row` entering the viewport
    ///
    /// Returns `None` when the event did not trigger a fetch. While observing,
    /// the sentinel first moves to the list's current last row, so rows added
    /// or removed by local patches do not strand it on a stale index.
    pub async fn on_row_visible<F: PageFetcher>(
        &mut self,
        row: usize,
        cache: &InfiniteCache<F>,
        key: &QueryKey,
    ) -> Result<Option<FetchOutcome>> {
        if self.state != SentinelState::NotObserving {
            self.observe(cache.rows(key).len());
        }
        if !self.should_trigger(row, cache.has_next_page(key), cache.is_fetching_next_page(key)) {
            return Ok(None);
        }

        debug!(%key, row, "sentinel row visible, fetching next page");
        let outcome = cache.fetch_next_page(key).await;

        // Re-attach to whatever the list now ends with, even after a failure
        self.observe(cache.rows(key).len());
        outcome.map(Some)
    }
}
