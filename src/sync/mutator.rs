//! Optimistic Mutator
//!
//! Keeps a visible list consistent right after a local create/update/delete.
//! The backend call runs first; only when it succeeds are the cached pages of
//! the affected key patched. Other keys are never touched, and a failed call
//! leaves the cache exactly as it was.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::Result;
use crate::sync::{InfiniteCache, PageFetcher, QueryKey};

/// Applies post-mutation patches to one cache
pub struct OptimisticMutator<F: PageFetcher> {
    cache: InfiniteCache<F>,
}

impl<F: PageFetcher> Clone for OptimisticMutator<F> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<F: PageFetcher> OptimisticMutator<F> {
    pub fn new(cache: InfiniteCache<F>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &InfiniteCache<F> {
        &self.cache
    }

    /// Run `mutation`, then drop the record `id` from `key`'s pages
    pub async fn remove<T, Fut>(&self, key: &QueryKey, id: &str, mutation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let value = mutation.await.inspect_err(|err| {
            warn!(%key, id, error = %err, "delete rejected, cache untouched");
        })?;
        let removed = self.cache.remove_record(key, id);
        debug!(%key, id, removed, "record removed from cache");
        Ok(value)
    }

    /// Run `mutation`, then apply `patch` to the record `id` with the result
    pub async fn update<T, Fut, P>(&self, key: &QueryKey, id: &str, mutation: Fut, patch: P) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
        P: FnOnce(&mut F::Record, &T),
    {
        let value = mutation.await.inspect_err(|err| {
            warn!(%key, id, error = %err, "update rejected, cache untouched");
        })?;
        let patched = self.cache.update_record(key, id, |record| patch(record, &value));
        debug!(%key, id, patched, "record patched in cache");
        Ok(value)
    }

    /// Run `mutation`, then replace the record `id` with the one it returned
    pub async fn replace<Fut>(&self, key: &QueryKey, id: &str, mutation: Fut) -> Result<F::Record>
    where
        Fut: Future<Output = Result<F::Record>>,
    {
        self.update(key, id, mutation, |record, fresh| *record = fresh.clone())
            .await
    }

    /// Run a create `mutation`, then show the created record at the top of the list
    pub async fn prepend<Fut>(&self, key: &QueryKey, mutation: Fut) -> Result<F::Record>
    where
        Fut: Future<Output = Result<F::Record>>,
    {
        let record = mutation.await.inspect_err(|err| {
            warn!(%key, error = %err, "create rejected, cache untouched");
        })?;
        let inserted = self.cache.prepend_record(key, record.clone());
        debug!(%key, inserted, "created record added to cache");
        Ok(record)
    }
}
