//! Sync Events
//!
//! Notifications emitted by an infinite cache for whoever renders the lists
//! (status bars, log panels, tests). Delivery is best effort.

use crate::sync::QueryKey;

/// Events emitted by the cache layer
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// A page response was stored
    PageLoaded {
        key: QueryKey,
        page: u32,
        len: usize,
        has_next: bool,
    },

    /// A page request failed; previously loaded pages are untouched
    FetchFailed {
        key: QueryKey,
        page: u32,
        message: String,
    },

    /// A response arrived for a superseded request and was dropped
    StaleDiscarded { key: QueryKey, page: u32 },

    /// Cached pages were changed locally
    Patched { key: QueryKey },

    /// The list was marked for a full refetch
    Invalidated { key: QueryKey },

    /// The list was discarded by its owner
    Removed { key: QueryKey },

    /// The list was dropped by the retention policy
    Evicted { key: QueryKey },
}

impl SyncEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            SyncEvent::PageLoaded { key, .. }
            | SyncEvent::FetchFailed { key, .. }
            | SyncEvent::StaleDiscarded { key, .. }
            | SyncEvent::Patched { key }
            | SyncEvent::Invalidated { key }
            | SyncEvent::Removed { key }
            | SyncEvent::Evicted { key } => key,
        }
    }
}
