//! Pages and Fetch Status
//!
//! A page is one backend response plus the number it was requested with.

use crate::domain::Record;

/// One fetched batch of records
#[derive(Clone, Debug, PartialEq)]
pub struct Page<R> {
    number: u32,
    /// Length of the backend response, before any local removal
    fetched_len: usize,
    records: Vec<R>,
}

impl<R: Record> Page<R> {
    pub fn new(number: u32, records: Vec<R>) -> Self {
        Self {
            number,
            fetched_len: records.len(),
            records,
        }
    }

    /// Page number used for the request (1-based)
    pub fn number(&self) -> u32 {
        self.number
    }

    /// How many records the backend returned for this page
    pub fn fetched_len(&self) -> usize {
        self.fetched_len
    }

    /// A full page implies more records may exist
    pub fn is_full(&self, page_size: u32) -> bool {
        self.fetched_len >= page_size as usize
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<R> {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove a record by id, returning whether anything was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.record_id() != id);
        self.records.len() != before
    }

    /// Find a record by id
    pub fn find_mut(&mut self, id: &str) -> Option<&mut R> {
        self.records.iter_mut().find(|r| r.record_id() == id)
    }
}

/// Flatten pages in fetch order into one continuous list
pub fn flatten<R: Clone>(pages: &[Page<R>]) -> Vec<R> {
    pages
        .iter()
        .flat_map(|page| page.records.iter().cloned())
        .collect()
}

/// Fetch status of one list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
    Refetching,
    Error,
}

impl FetchStatus {
    /// Whether any request for the list is outstanding
    pub fn is_fetching(&self) -> bool {
        matches!(
            self,
            FetchStatus::FetchingFirstPage | FetchStatus::FetchingNextPage | FetchStatus::Refetching
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchStatus::Idle => "idle",
            FetchStatus::FetchingFirstPage => "fetching-first-page",
            FetchStatus::FetchingNextPage => "fetching-next-page",
            FetchStatus::Refetching => "refetching",
            FetchStatus::Error => "error",
        }
    }
}

/// What happened to a fetch request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page stored; `has_next` reflects the has-more heuristic afterwards
    Loaded { page: u32, len: usize, has_next: bool },
    /// The last page was short, nothing requested
    Exhausted,
    /// Another request for the same list is outstanding, nothing requested
    InFlight,
    /// Response arrived for a superseded list generation and was dropped
    Stale { page: u32 },
}

impl FetchOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded { .. })
    }
}

/// How much of a list a refresh re-fetches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RefetchMode {
    /// Re-fetch page 1 and drop the rest
    #[default]
    FirstPage,
    /// Re-fetch every page currently loaded
    AllPages,
}
