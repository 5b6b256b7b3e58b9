//! Per-year result cache with TTL, bounded capacity and single-flight loads.
//!
//! Follows the same shape as the other in-memory caches in this crate: a
//! `DashMap` of timestamped `Arc` entries. Concurrent misses for the same year
//! share one loader future instead of racing, and the loader's error (if any)
//! is handed to every waiter without being cached.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

type PendingLoad<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, E>>>;

struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    last_access: Instant,
}

pub struct YearCache<V, E = Infallible> {
    entries: DashMap<i32, CacheEntry<V>>,
    inflight: DashMap<i32, PendingLoad<V, E>>,
    ttl: Duration,
    capacity: usize,
}

impl<V, E> YearCache<V, E>
where
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Return the cached value for `year` if it has not expired.
    pub fn get(&self, year: i32) -> Option<Arc<V>> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(&year)?;
            if now.duration_since(entry.inserted_at) < self.ttl {
                entry.last_access = now;
                return Some(Arc::clone(&entry.value));
            }
        }
        self.entries
            .remove_if(&year, |_, entry| now.duration_since(entry.inserted_at) >= self.ttl);
        None
    }

    /// Return the cached value, or run `load` once for all concurrent callers of this year.
    pub async fn get_or_load<F, Fut>(&self, year: i32, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.get(year) {
            return Ok(value);
        }

        let pending = match self.inflight.entry(year) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                // A load may have finished between the lookup above and claiming the slot.
                if let Some(value) = self.get(year) {
                    return Ok(value);
                }
                debug!(year, "cache miss, loading");
                let pending = load().map(|result| result.map(Arc::new)).boxed().shared();
                slot.insert(pending.clone());
                pending
            }
        };

        let result = pending.clone().await;

        // Publish before clearing the in-flight slot so no caller sees neither.
        let still_registered = self
            .inflight
            .get(&year)
            .is_some_and(|current| current.ptr_eq(&pending));
        if still_registered {
            if let Ok(value) = &result {
                self.insert(year, Arc::clone(value));
            }
            self.inflight
                .remove_if(&year, |_, current| current.ptr_eq(&pending));
        }

        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&self, year: i32, value: Arc<V>) {
        let now = Instant::now();
        if !self.entries.contains_key(&year) && self.entries.len() >= self.capacity {
            self.evict(now);
        }
        self.entries.insert(
            year,
            CacheEntry {
                value,
                inserted_at: now,
                last_access: now,
            },
        );
    }

    /// Drop expired entries, then least-recently-used ones until there is room for one more.
    fn evict(&self, now: Instant) {
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);

        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.last_access)
                .map(|entry| *entry.key());
            match oldest {
                Some(year) => {
                    debug!(year, "evicting least recently used year");
                    self.entries.remove(&year);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String, String>> + use<> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_skips_loader() {
        let cache: YearCache<String, String> = YearCache::new(Duration::from_secs(60), 10);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.get_or_load(1999, counting_loader(&calls, "a")).await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = cache.get_or_load(1999, counting_loader(&calls, "b")).await.unwrap();

        assert_eq!(*first, "a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_reloaded() {
        let cache: YearCache<String, String> = YearCache::new(Duration::from_secs(60), 10);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_load(1999, counting_loader(&calls, "a")).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(1999).is_none());
        let reloaded = cache.get_or_load(1999, counting_loader(&calls, "b")).await.unwrap();

        assert_eq!(*reloaded, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_load() {
        let cache: Arc<YearCache<String, String>> =
            Arc::new(YearCache::new(Duration::from_secs(60), 10));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loader = counting_loader(&calls, "shared");
                tokio::spawn(async move { cache.get_or_load(2001, loader).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: YearCache<String, String> = YearCache::new(Duration::from_secs(60), 10);

        let failed = cache
            .get_or_load(2005, || async { Err::<String, _>("boom".to_string()) })
            .await;
        assert_eq!(failed.unwrap_err(), "boom");
        assert!(cache.is_empty());

        let ok = cache
            .get_or_load(2005, || async { Ok::<_, String>("fine".to_string()) })
            .await
            .unwrap();
        assert_eq!(*ok, "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_used() {
        let cache: YearCache<i32, String> = YearCache::new(Duration::from_secs(600), 2);

        cache.get_or_load(1, || async { Ok(1) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_load(2, || async { Ok(2) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        // Touch 1 so 2 becomes the least recently used.
        assert!(cache.get(1).is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_load(3, || async { Ok(3) }).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
    }
}
