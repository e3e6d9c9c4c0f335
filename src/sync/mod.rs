//! List Synchronization
//!
//! Incremental loading of paginated backend lists into a local cache.
//!
//! ## Architecture
//!
//! ```text
//! search input ──▶ Debounced ──▶ QueryKey ──┐
//! owner / filters ──────────────────────────┤
//!                                           ▼
//!                   ┌──────────── ListController ────────────┐
//!                   │ ScrollSentinel   OptimisticMutator     │
//!                   └──────────────────┬─────────────────────┘
//!                                      ▼
//!                               InfiniteCache ──SyncEvent──▶ observers
//!                                      │
//!                                      ▼ PageRequest
//!                                 PageFetcher (REST)
//! ```

mod controller;
mod debounce;
mod events;
mod fetcher;
mod infinite_cache;
mod mutator;
mod page;
mod query_key;
mod sentinel;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::*;
pub use debounce::*;
pub use events::*;
pub use fetcher::*;
pub use infinite_cache::*;
pub use mutator::*;
pub use page::*;
pub use query_key::*;
pub use sentinel::*;
