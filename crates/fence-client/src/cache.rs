//! Per-tenant scoped handle cache using moka
//!
//! Holds at most `capacity` handles, evicting the least recently used one
//! when full. Concurrent first requests for a tenant share one construction,
//! and a failed construction leaves nothing behind.

use crate::error::CacheError;
use crate::factory::ScopedClientFactory;
use crate::handle::ScopedHandle;
use fence_model::{IsolationPolicy, TenantId};
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default number of cached tenants
pub const DEFAULT_CAPACITY: u64 = 100;

/// Cache sizing and expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of cached handles
    pub capacity: u64,
    /// Drop handles not used for this long
    pub time_to_idle: Option<Duration>,
}

impl CacheSettings {
    /// Settings with the given capacity and no idle expiry
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity,
            time_to_idle: None,
        }
    }

    /// Set idle expiry
    #[inline]
    #[must_use]
    pub fn with_time_to_idle(mut self, idle: Duration) -> Self {
        self.time_to_idle = Some(idle);
        self
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to construct (or wait for) a handle
    pub misses: u64,
    /// Handles successfully built
    pub constructions: u64,
    /// Handles dropped to stay within capacity
    pub evictions: u64,
    /// Handles dropped by idle expiry
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    constructions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Bounded, concurrency-safe map from tenant to [`ScopedHandle`]
///
/// Cloning is cheap and clones share entries.
#[derive(Debug, Clone)]
pub struct ScopedClientCache {
    inner: Cache<TenantId, Arc<ScopedHandle>>,
    factory: Arc<ScopedClientFactory>,
    counters: Arc<Counters>,
}

impl ScopedClientCache {
    /// Create cache over a factory
    #[must_use]
    pub fn new(factory: ScopedClientFactory, settings: CacheSettings) -> Self {
        let counters = Arc::new(Counters::default());
        let listener_counters = Arc::clone(&counters);

        let mut builder = Cache::builder()
            .max_capacity(settings.capacity)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |tenant: Arc<TenantId>, _: Arc<ScopedHandle>, cause| match cause {
                RemovalCause::Size => {
                    listener_counters.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Evicted scoped handle for tenant: {}", tenant);
                }
                RemovalCause::Expired => {
                    listener_counters.expirations.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Expired scoped handle for tenant: {}", tenant);
                }
                _ => {}
            });
        if let Some(idle) = settings.time_to_idle {
            builder = builder.time_to_idle(idle);
        }

        Self {
            inner: builder.build(),
            factory: Arc::new(factory),
            counters,
        }
    }

    /// Policy every cached handle enforces
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        self.factory.policy()
    }

    /// Handle for `tenant`, building it on first use
    ///
    /// A handle returned here stays usable after it is evicted.
    ///
    /// # Errors
    /// Returns the factory's `CacheError`; the failure is not cached
    pub async fn get(&self, tenant: &TenantId) -> Result<Arc<ScopedHandle>, CacheError> {
        if let Some(handle) = self.inner.get(tenant).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(handle);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let factory = &self.factory;
        let counters = &self.counters;
        let handle = self
            .inner
            .try_get_with(tenant.clone(), async move {
                let handle = factory.build(tenant)?;
                counters.constructions.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::new(handle))
            })
            .await
            .map_err(|err: Arc<CacheError>| {
                tracing::warn!("Failed to build scoped handle for tenant {}: {}", tenant, err);
                CacheError::clone(&err)
            })?;

        // moka defers size eviction to housekeeping; the bound must hold once a miss returns.
        self.inner.run_pending_tasks().await;
        Ok(handle)
    }

    /// Check if a handle for `tenant` is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.inner.contains_key(tenant)
    }

    /// Drop the handle for `tenant`
    #[inline]
    pub async fn invalidate(&self, tenant: &TenantId) {
        self.inner.invalidate(tenant).await;
    }

    /// Drop every handle
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending evictions and expirations
    #[inline]
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            constructions: self.counters.constructions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn cache(capacity: u64) -> ScopedClientCache {
        let policy = Arc::new(IsolationPolicy::new(["Visitor"]));
        let factory = ScopedClientFactory::new(Arc::new(MemoryStore::new()), policy);
        ScopedClientCache::new(factory, CacheSettings::with_capacity(capacity))
    }

    #[tokio::test]
    async fn second_get_is_a_hit() {
        let cache = cache(10);
        let tenant = TenantId::from("T1");

        let first = cache.get(&tenant).await.unwrap();
        let second = cache.get(&tenant).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.constructions, 1);
    }

    #[tokio::test]
    async fn distinct_tenants_get_distinct_handles() {
        let cache = cache(10);
        let a = cache.get(&TenantId::from("A")).await.unwrap();
        let b = cache.get(&TenantId::from("B")).await.unwrap();

        assert_eq!(a.tenant().as_str(), "A");
        assert_eq!(b.tenant().as_str(), "B");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn failed_construction_is_not_cached() {
        let cache = cache(10);
        let blank = TenantId::from(" ");

        assert!(cache.get(&blank).await.is_err());
        assert!(cache.get(&blank).await.is_err());
        cache.run_pending_tasks().await;

        assert!(!cache.contains(&blank));
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.stats().constructions, 0);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let cache = cache(10);
        let tenant = TenantId::from("T1");

        let first = cache.get(&tenant).await.unwrap();
        cache.invalidate(&tenant).await;
        assert!(!cache.contains(&tenant));

        let second = cache.get(&tenant).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().constructions, 2);
    }

    #[tokio::test]
    async fn invalidate_all_empties_cache() {
        let cache = cache(10);
        for id in ["A", "B", "C"] {
            cache.get(&TenantId::from(id)).await.unwrap();
        }

        cache.invalidate_all();
        cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn default_settings() {
        let settings = CacheSettings::default();
        assert_eq!(settings.capacity, DEFAULT_CAPACITY);
        assert!(settings.time_to_idle.is_none());

        let settings = settings.with_time_to_idle(Duration::from_secs(60));
        assert_eq!(settings.time_to_idle, Some(Duration::from_secs(60)));
    }
}
