//! Sync Constants
//!
//! Defaults shared by the configuration layer and the list machinery.

/// Records requested per page for every list view
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Quiet period before a search input is applied to the query key
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Number of list entries retained by a cache before LRU eviction
pub const MAX_CACHED_LISTS: usize = 64;

/// Backend defaults
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Retry configuration
pub const RETRY_INITIAL_DELAY_MS: u64 = 250;
pub const RETRY_MAX_DELAY_MS: u64 = 5000;
pub const RETRY_MULTIPLIER: f64 = 2.0;
pub const RETRY_JITTER: f64 = 0.1;
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Application identity used for platform directories
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "crm";
pub const APP_NAME: &str = "crm-sync";
