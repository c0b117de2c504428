//! Memoization layer for data accessors.
//!
//! ## Design
//!
//! - **Cache Key**: accessor name plus the canonical encoding of its arguments,
//!   so option objects that differ only in field order share a slot
//! - **Cache Value**: type-erased `Arc`, handed out as the same reference on
//!   every hit
//! - **Invalidation**: [`Cache::clear`] bumps an epoch and drops every entry;
//!   entries computed under an older epoch are never served, which covers a
//!   reader that finished computing from a superseded document after the clear
//!
//! The cache is unbounded. The key space is (accessor × type name × option
//! combination), which is small and finite for well-behaved callers; a call
//! site that feeds unbounded dynamic arguments (e.g. user input as a type
//! name) grows it without limit until the next schema change.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::canonical::canonical_key;
use crate::error::Result;

/// Identity of a memoized call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Accessor identity.
    pub accessor: &'static str,
    /// Canonical argument encoding.
    pub args: String,
}

impl CacheKey {
    pub fn new(accessor: &'static str, args: impl Into<String>) -> Self {
        Self {
            accessor,
            args: args.into(),
        }
    }
}

struct CacheEntry {
    epoch: u64,
    value: Arc<dyn Any + Send + Sync>,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub clears: u64,
    pub entries: usize,
}

/// Concurrent memo table shared by all accessors of one SDK instance.
#[derive(Default)]
pub struct Cache {
    entries: DashMap<CacheKey, CacheEntry>,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current invalidation epoch; bumped by every [`Cache::clear`].
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Returns the memoized value for `key`, if present and current.
    pub fn get<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.lookup(key, self.epoch())
    }

    /// Returns the memoized value for `key`, computing and storing it on a miss.
    ///
    /// The epoch is read before `compute` runs; the result is stored under
    /// that epoch, so a clear that lands mid-computation leaves the result
    /// unreachable. Errors are returned without being memoized. Two threads
    /// missing on the same key may both compute; accessors are pure, so the
    /// only cost is duplicated work.
    pub fn get_or_try_insert_with<T, F>(&self, key: CacheKey, compute: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        let epoch = self.epoch();
        if let Some(value) = self.lookup::<T>(&key, epoch) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = Arc::new(compute()?);
        let stored: Arc<dyn Any + Send + Sync> = value.clone();
        self.entries
            .entry(key)
            .and_modify(|entry| {
                if entry.epoch <= epoch {
                    entry.epoch = epoch;
                    entry.value = Arc::clone(&stored);
                }
            })
            .or_insert_with(|| CacheEntry {
                epoch,
                value: Arc::clone(&stored),
            });
        Ok(value)
    }

    fn lookup<T: Send + Sync + 'static>(&self, key: &CacheKey, epoch: u64) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        if entry.epoch != epoch {
            return None;
        }
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    /// Drops every memoized entry regardless of key.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let dropped = self.entries.len();
        self.entries.clear();
        debug!(dropped, "Cleared accessor cache");
    }

    /// Number of stored entries, including ones awaiting replacement.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            clears: self.epoch(),
            entries: self.entries.len(),
        }
    }

    /// Wraps `compute` so its results are memoized on
    /// `(accessor, canonical encoding of the arguments)`.
    pub fn add_cache_to_function<A, T, F>(
        self: &Arc<Self>,
        accessor: &'static str,
        compute: F,
    ) -> Memoized<A, T>
    where
        A: Serialize + 'static,
        T: Send + Sync + 'static,
        F: Fn(&A) -> Result<T> + Send + Sync + 'static,
    {
        self.add_cache_to_function_with_key(accessor, |args: &A| canonical_key(args), compute)
    }

    /// Like [`Cache::add_cache_to_function`] with a custom key generator.
    ///
    /// `key_generator` must be deterministic and must map semantically
    /// equal arguments to the same string.
    pub fn add_cache_to_function_with_key<A, T, K, F>(
        self: &Arc<Self>,
        accessor: &'static str,
        key_generator: K,
        compute: F,
    ) -> Memoized<A, T>
    where
        A: 'static,
        T: Send + Sync + 'static,
        K: Fn(&A) -> Result<String> + Send + Sync + 'static,
        F: Fn(&A) -> Result<T> + Send + Sync + 'static,
    {
        Memoized {
            cache: Arc::clone(self),
            accessor,
            key_generator: Arc::new(key_generator),
            compute: Arc::new(compute),
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.entries.len())
            .field("epoch", &self.epoch())
            .finish()
    }
}

type KeyGenerator<A> = Arc<dyn Fn(&A) -> Result<String> + Send + Sync>;
type Compute<A, T> = Arc<dyn Fn(&A) -> Result<T> + Send + Sync>;

/// A function whose results are memoized in a [`Cache`].
pub struct Memoized<A, T> {
    cache: Arc<Cache>,
    accessor: &'static str,
    key_generator: KeyGenerator<A>,
    compute: Compute<A, T>,
}

impl<A, T: Send + Sync + 'static> Memoized<A, T> {
    /// Returns the memoized result for `args`, computing it on a miss.
    pub fn call(&self, args: &A) -> Result<Arc<T>> {
        let key = CacheKey::new(self.accessor, (self.key_generator)(args)?);
        self.cache.get_or_try_insert_with(key, || (self.compute)(args))
    }

    pub fn accessor(&self) -> &'static str {
        self.accessor
    }
}

impl<A, T> Clone for Memoized<A, T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            accessor: self.accessor,
            key_generator: Arc::clone(&self.key_generator),
            compute: Arc::clone(&self.compute),
        }
    }
}

impl<A, T> std::fmt::Debug for Memoized<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("accessor", &self.accessor)
            .finish()
    }
}
