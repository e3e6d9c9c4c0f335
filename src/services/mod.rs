//! Service Layer
//!
//! Talks to the CRM REST backend and wires one list cache per record type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SyncHub                               │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌───────────────┐   │
//! │  │  ApiClient  │  │ RestFetcher<R>   │  │  RetryPolicy  │   │
//! │  │  (reqwest)  │  │ (one per record) │  │  (backoff)    │   │
//! │  └─────────────┘  └──────────────────┘  └───────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ SyncEvent
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Feature lists (ListController)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod api;
mod hub;
mod retry;

pub use api::*;
pub use hub::*;
pub use retry::*;
