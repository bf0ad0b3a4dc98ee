//! Get-or-load memoizing cache for reference tables.

use std::sync::{Arc, PoisonError, RwLock};

use crate::ReferenceError;

type Loader<T> = Box<dyn Fn() -> Result<Arc<T>, ReferenceError> + Send + Sync>;

/// Loads a reference table on first use and hands out shared snapshots
/// until [`ReferenceCache::invalidate`] is called.
///
/// A failed load leaves the cache empty, so the next [`ReferenceCache::get`]
/// retries.
pub struct ReferenceCache<T> {
    name: &'static str,
    loader: Loader<T>,
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: Send + Sync + 'static> ReferenceCache<T> {
    /// Creates an empty cache backed by `loader`.
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<T, ReferenceError> + Send + Sync + 'static,
    {
        Self {
            name,
            loader: Box::new(move || loader().map(Arc::new)),
            slot: RwLock::new(None),
        }
    }

    /// Creates a cache that always yields `value`, even after invalidation.
    #[must_use]
    pub fn preloaded(name: &'static str, value: T) -> Self {
        let shared = Arc::new(value);
        Self {
            name,
            slot: RwLock::new(Some(Arc::clone(&shared))),
            loader: Box::new(move || Ok(Arc::clone(&shared))),
        }
    }

    /// Table name used in log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the memoized table, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Propagates the loader's [`ReferenceError`].
    pub fn get(&self) -> Result<Arc<T>, ReferenceError> {
        {
            let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = slot.as_ref() {
                return Ok(Arc::clone(value));
            }
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }

        log::debug!("Loading {} reference table", self.name);
        let value = (self.loader)()?;
        *slot = Some(Arc::clone(&value));
        drop(slot);

        Ok(value)
    }

    /// Drops the memoized table; the next [`ReferenceCache::get`] reloads.
    pub fn invalidate(&self) {
        log::debug!("Invalidating {} reference table", self.name);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a table is currently memoized.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
