use analysis_core::{AnalysisContext, AnalysisRequest, Bar, Timeframe};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

/// Bars are cached per (ticker, context, timeframe)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarCacheKey {
    pub ticker: String,
    pub context: AnalysisContext,
    pub timeframe: Option<Timeframe>,
}

impl From<&AnalysisRequest> for BarCacheKey {
    fn from(request: &AnalysisRequest) -> Self {
        Self {
            ticker: request.ticker.to_uppercase(),
            context: request.context,
            timeframe: request.timeframe,
        }
    }
}

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        // A negative age (clock moved backwards) counts as fresh
        (Utc::now() - self.cached_at)
            .to_std()
            .map(|age| age < ttl)
            .unwrap_or(true)
    }
}

/// TTL cache for price series, bounded to `capacity` entries. When full the
/// oldest entry is evicted.
pub struct BarCache {
    entries: DashMap<BarCacheKey, CacheEntry<Vec<Bar>>>,
    ttl: Duration,
    capacity: usize,
}

impl BarCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, key: &BarCacheKey) -> Option<Vec<Bar>> {
        let fresh = self
            .entries
            .get(key)
            .map(|entry| entry.is_fresh(self.ttl).then(|| entry.data.clone()))?;
        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    pub fn insert(&self, key: BarCacheKey, bars: Vec<Bar>) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired();
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                data: bars,
                cached_at: Utc::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
        before.saturating_sub(self.entries.len())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            tracing::debug!("Bar cache full, evicting {}", key.ticker);
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(ticker: &str) -> BarCacheKey {
        BarCacheKey::from(&AnalysisRequest::new(ticker, AnalysisContext::Trading, Some(Timeframe::OneDay)))
    }

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Bar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = BarCache::new(Duration::from_secs(60), 8);
        cache.insert(key("ACME"), bars(3));
        assert_eq!(cache.get(&key("acme")).map(|b| b.len()), Some(3));
    }

    #[test]
    fn test_zero_ttl_always_misses() {
        let cache = BarCache::new(Duration::ZERO, 8);
        cache.insert(key("ACME"), bars(3));
        assert!(cache.get(&key("ACME")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_context_and_timeframe_are_part_of_the_key() {
        let cache = BarCache::new(Duration::from_secs(60), 8);
        cache.insert(key("ACME"), bars(3));
        let other = BarCacheKey::from(&AnalysisRequest::new("ACME", AnalysisContext::Investment, None));
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = BarCache::new(Duration::from_secs(60), 2);
        cache.insert(key("AAA"), bars(1));
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(key("BBB"), bars(1));
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(key("CCC"), bars(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("AAA")).is_none());
        assert!(cache.get(&key("BBB")).is_some());
        assert!(cache.get(&key("CCC")).is_some());
    }

    #[test]
    fn test_clear_forces_miss() {
        let cache = BarCache::new(Duration::from_secs(60), 8);
        cache.insert(key("ACME"), bars(2));
        cache.insert(key("BBB"), bars(2));

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key("ACME")).is_none());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = BarCache::new(Duration::from_secs(60), 0);
        cache.insert(key("ACME"), bars(1));
        assert!(cache.is_empty());
    }
}
