//! Short-lived read-through cache for the store's lookups and counts.

use std::time::Duration;

use moka::sync::Cache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    NextUnindexed,
    TotalDocuments,
    IndexedDocuments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CachedValue {
    Id(Option<i64>),
    Count(u64),
}

/// Caches query results for a fixed TTL. Disabled when built without one.
#[derive(Clone)]
pub struct ReadThroughCache {
    inner: Option<Cache<CacheKey, CachedValue>>,
}

impl ReadThroughCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        let inner = ttl.map(|ttl| Cache::builder().max_capacity(16).time_to_live(ttl).build());
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn id<E>(
        &self,
        key: CacheKey,
        load: impl FnOnce() -> Result<Option<i64>, E>,
    ) -> Result<Option<i64>, E> {
        if let Some(CachedValue::Id(id)) = self.lookup(key) {
            return Ok(id);
        }
        let id = load()?;
        self.store(key, CachedValue::Id(id));
        Ok(id)
    }

    pub fn count<E>(&self, key: CacheKey, load: impl FnOnce() -> Result<u64, E>) -> Result<u64, E> {
        if let Some(CachedValue::Count(count)) = self.lookup(key) {
            return Ok(count);
        }
        let count = load()?;
        self.store(key, CachedValue::Count(count));
        Ok(count)
    }

    /// Drops every cached entry.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }

    fn lookup(&self, key: CacheKey) -> Option<CachedValue> {
        self.inner.as_ref().and_then(|cache| cache.get(&key))
    }

    fn store(&self, key: CacheKey, value: CachedValue) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn loader(calls: &Cell<u32>, value: u64) -> impl FnOnce() -> Result<u64, ()> + '_ {
        move || {
            calls.set(calls.get() + 1);
            Ok(value)
        }
    }

    #[test]
    fn test_hits_skip_the_loader() {
        let cache = ReadThroughCache::new(Some(Duration::from_secs(60)));
        let calls = Cell::new(0);

        assert_eq!(cache.count(CacheKey::TotalDocuments, loader(&calls, 7)), Ok(7));
        assert_eq!(cache.count(CacheKey::TotalDocuments, loader(&calls, 8)), Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache = ReadThroughCache::new(Some(Duration::from_secs(60)));
        let calls = Cell::new(0);

        cache.count(CacheKey::IndexedDocuments, loader(&calls, 1)).unwrap();
        cache.invalidate();
        assert_eq!(cache.count(CacheKey::IndexedDocuments, loader(&calls, 2)), Ok(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_disabled_cache_always_loads() {
        let cache = ReadThroughCache::disabled();
        let calls = Cell::new(0);

        cache.count(CacheKey::TotalDocuments, loader(&calls, 1)).unwrap();
        cache.count(CacheKey::TotalDocuments, loader(&calls, 1)).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_absent_id_is_cached_too() {
        let cache = ReadThroughCache::new(Some(Duration::from_secs(60)));
        assert_eq!(cache.id(CacheKey::NextUnindexed, || Ok::<_, ()>(None)), Ok(None));
        assert_eq!(cache.id(CacheKey::NextUnindexed, || Ok::<_, ()>(Some(3))), Ok(None));
    }

    #[test]
    fn test_load_errors_are_not_cached() {
        let cache = ReadThroughCache::new(Some(Duration::from_secs(60)));
        assert_eq!(cache.count(CacheKey::TotalDocuments, || Err("boom")), Err("boom"));
        assert_eq!(cache.count(CacheKey::TotalDocuments, || Ok::<_, &str>(4)), Ok(4));
    }
}
