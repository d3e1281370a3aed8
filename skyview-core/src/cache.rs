//! Time-boxed memoisation of API responses.
//!
//! Entries older than the TTL are ignored on read but never purged; the next
//! `put` for the same key overwrites them.

use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::minutes(10);

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ResponseCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache on the wall clock with the default TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL, Arc::new(SystemClock))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value stored under `key` unless it is older than the TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;

        if self.clock.now() - entry.stored_at > self.ttl {
            debug!(key, "cache entry expired");
            return None;
        }

        debug!(key, "cache hit");
        Some(entry.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: T) {
        let stored_at = self.clock.now();
        self.entries().insert(key.into(), CacheEntry { value, stored_at });
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // Entries are written whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cache_at_epoch() -> (ResponseCache<Vec<String>>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let cache = ResponseCache::new(DEFAULT_TTL, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn missing_key_is_absent() {
        let (cache, _) = cache_at_epoch();
        assert_eq!(cache.get("search_Ankara"), None);
    }

    #[test]
    fn entry_is_served_within_ttl_and_ignored_after() {
        let (cache, clock) = cache_at_epoch();
        cache.put("search_Ankara", vec!["Ankara".to_string()]);

        clock.advance(Duration::minutes(9));
        assert_eq!(cache.get("search_Ankara"), Some(vec!["Ankara".to_string()]));

        clock.advance(Duration::minutes(2));
        assert_eq!(cache.get("search_Ankara"), None);
    }

    #[test]
    fn entry_exactly_at_ttl_is_still_fresh() {
        let (cache, clock) = cache_at_epoch();
        cache.put("k", vec![]);

        clock.advance(DEFAULT_TTL);
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn expired_entries_are_not_purged() {
        let (cache, clock) = cache_at_epoch();
        cache.put("a", vec![]);
        clock.advance(Duration::hours(1));

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_overwrites_and_refreshes_timestamp() {
        let (cache, clock) = cache_at_epoch();
        cache.put("k", vec!["old".to_string()]);
        clock.advance(Duration::minutes(15));

        cache.put("k", vec!["new".to_string()]);
        clock.advance(Duration::minutes(5));

        assert_eq!(cache.get("k"), Some(vec!["new".to_string()]));
        assert_eq!(cache.len(), 1);
    }
}
