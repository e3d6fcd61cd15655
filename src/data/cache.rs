use {
    crate::utils::Clock,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex, PoisonError},
        time::Duration,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp_ms: i64,
}

/// Keyed cache whose entries expire purely by age. No eviction beyond overwrite.
pub struct TtlCache<T> {
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as i64,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms as u64)
    }

    /// Entry for `key` only if it is younger than the TTL.
    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| now - e.timestamp_ms < self.ttl_ms)
            .map(|e| e.data.clone())
    }

    /// Last stored entry regardless of age. Only for failure fallback.
    pub fn get_any(&self, key: &str) -> Option<CacheEntry<T>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: &str, data: T) {
        let entry = CacheEntry {
            data,
            timestamp_ms: self.clock.now_ms(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    fn cache(ttl_secs: u64) -> (Arc<ManualClock>, TtlCache<Vec<u8>>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = TtlCache::new(Duration::from_secs(ttl_secs), clock.clone());
        (clock, cache)
    }

    #[test]
    fn fresh_until_ttl_then_gone() {
        let (clock, cache) = cache(15);
        cache.insert("BTC,ETH", vec![1, 2, 3]);

        clock.advance_ms(14_999);
        assert_eq!(cache.get_fresh("BTC,ETH"), Some(vec![1, 2, 3]));

        clock.advance_ms(1);
        assert_eq!(cache.get_fresh("BTC,ETH"), None);
    }

    #[test]
    fn stale_entries_remain_available_for_fallback() {
        let (clock, cache) = cache(15);
        cache.insert("SPY", vec![9]);
        clock.advance_ms(60_000);

        let entry = cache.get_any("SPY").expect("entry kept");
        assert_eq!(entry.data, vec![9]);
        assert_eq!(entry.timestamp_ms, 1_000_000);
    }

    #[test]
    fn insert_overwrites_and_restamps() {
        let (clock, cache) = cache(30);
        cache.insert("k", vec![1]);
        clock.advance_ms(29_000);
        cache.insert("k", vec![2]);
        clock.advance_ms(29_000);

        assert_eq!(cache.get_fresh("k"), Some(vec![2]));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_key_misses() {
        let (_clock, cache) = cache(30);
        assert_eq!(cache.get_fresh("nope"), None);
        assert!(cache.get_any("nope").is_none());
    }
}
