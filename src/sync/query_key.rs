//! Query Key
//!
//! Composite identity of one logical paginated list. Two keys address the same
//! cached pages iff every element is equal.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::EntityKind;

/// Identity of a paginated list: kind, owner, debounced search and filters
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: EntityKind,
    owner: Option<Arc<str>>,
    search: Arc<str>,
    filters: BTreeMap<Arc<str>, Arc<str>>,
}

impl QueryKey {
    /// Unfiltered, unowned list of `kind`
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            owner: None,
            search: Arc::from(""),
            filters: BTreeMap::new(),
        }
    }

    /// Scope the list to an owning entity (agent for clients, client for accounts, ...)
    pub fn with_owner(mut self, owner: Option<impl Into<Arc<str>>>) -> Self {
        self.owner = owner.map(Into::into).filter(|o: &Arc<str>| !o.trim().is_empty());
        self
    }

    /// Set the search text; surrounding whitespace is not significant
    pub fn with_search(mut self, search: &str) -> Self {
        self.search = Arc::from(search.trim());
        self
    }

    /// Add a filter; an empty value removes the filter
    pub fn with_filter(mut self, name: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.filters.remove(&name);
        } else {
            self.filters.insert(name, value);
        }
        self
    }

    /// Add every filter of an iterator
    pub fn with_filters<I, K, V>(self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arc<str>>,
        V: Into<Arc<str>>,
    {
        filters
            .into_iter()
            .fold(self, |key, (name, value)| key.with_filter(name, value))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_ref(), v.as_ref()))
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(|v| v.as_ref())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut parts = Vec::new();
        if let Some(owner) = &self.owner {
            parts.push(format!("owner={owner}"));
        }
        if !self.search.is_empty() {
            parts.push(format!("q={:?}", self.search));
        }
        for (name, value) in &self.filters {
            parts.push(format!("{name}={value}"));
        }
        if !parts.is_empty() {
            write!(f, "[{}]", parts.join(","))?;
        }
        Ok(())
    }
}
