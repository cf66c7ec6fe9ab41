//! Shared query cache keyed by resource scope and page.
//!
//! Entries live in a bounded moka cache and expire after a TTL. Every scope
//! also carries an epoch that mutations bump: readers compare the epoch they
//! loaded against the current one to know a refresh is due, and an entry
//! written under an older epoch is never served.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

/// Default number of cached pages.
pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Default lifetime of a cached page.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// What a cached entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Posts,
    Post(i64),
    Comments(i64),
    Users,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Posts => "posts",
            Scope::Post(_) => "post",
            Scope::Comments(_) => "comments",
            Scope::Users => "users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: Scope,
    /// 0 for unpaginated reads.
    pub page: u32,
}

impl CacheKey {
    pub fn new(scope: Scope, page: u32) -> Self {
        Self { scope, page }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    epoch: u64,
    cached_at: Instant,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: MokaCache<CacheKey, CacheEntry>,
    epochs: Arc<Mutex<HashMap<Scope, u64>>>,
    ttl: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_settings(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_CAPACITY,
        )
    }

    pub fn with_settings(ttl: Duration, capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(capacity.max(1))
            .eviction_policy(EvictionPolicy::lru())
            .support_invalidation_closures()
            .build();
        Self {
            inner,
            epochs: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn epochs(&self) -> MutexGuard<'_, HashMap<Scope, u64>> {
        self.epochs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh entry for `key`, if any. Expired, superseded or unreadable
    /// entries are dropped and read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.inner.get(key).await?;
        if entry.cached_at.elapsed() > self.ttl {
            tracing::trace!(?key, "Cache entry expired");
            self.inner.invalidate(key).await;
            return None;
        }
        if entry.epoch != self.epoch(key.scope) {
            self.inner.invalidate(key).await;
            return None;
        }
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(?key, "Dropping unreadable cache entry: {}", e);
                self.inner.invalidate(key).await;
                None
            }
        }
    }

    /// Store `value` unless the scope was invalidated after `epoch` was read.
    /// Returns whether the entry was written.
    pub async fn insert<T: Serialize>(&self, key: CacheKey, value: &T, epoch: u64) -> bool {
        if self.epoch(key.scope) != epoch {
            return false;
        }
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(?key, "Skipping cache write: {}", e);
                return false;
            }
        };
        let entry = CacheEntry {
            value,
            epoch,
            cached_at: Instant::now(),
        };
        self.inner.insert(key, entry).await;
        true
    }

    /// Drop every page of `scope` and bump its epoch.
    pub fn invalidate(&self, scope: Scope) {
        *self.epochs().entry(scope).or_insert(0) += 1;
        // Entries of the old epoch are already unreachable; this frees them.
        if let Err(e) = self
            .inner
            .invalidate_entries_if(move |key, _| key.scope == scope)
        {
            tracing::debug!(?scope, "Deferred cache cleanup: {}", e);
        }
        tracing::debug!(?scope, "Invalidated cache scope");
    }

    pub fn epoch(&self, scope: Scope) -> u64 {
        self.epochs().get(&scope).copied().unwrap_or(0)
    }
}
