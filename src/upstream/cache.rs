// src/upstream/cache.rs
//! Injected response cache. Sources receive a `Arc<dyn Cache>` instead of
//! reaching for a process-wide memo table, so tests can pass a fake.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// In-memory cache with per-entry absolute TTL (no sliding refresh).
#[derive(Debug, Default)]
pub struct TtlCache {
    inner: Mutex<HashMap<String, (Instant, Value)>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let before = g.len();
        g.retain(|_, (expires, _)| *expires > now);
        before - g.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for TtlCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match g.get(key) {
            Some((expires, v)) if *expires > Instant::now() => Some(v.clone()),
            Some(_) => {
                g.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        // A ttl past the clock's range is not cacheable.
        let Some(expires) = Instant::now().checked_add(ttl) else {
            return;
        };
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), (expires, value));
    }
}

/// Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_before_expiry() {
        let c = TtlCache::new();
        c.set("k", json!({"a": 1}), Duration::from_secs(60));
        assert_eq!(c.get("k"), Some(json!({"a": 1})));
        assert_eq!(c.get("other"), None);
    }

    #[test]
    fn zero_ttl_is_not_stored() {
        let c = TtlCache::new();
        c.set("k", json!(1), Duration::ZERO);
        assert!(c.is_empty());
    }

    #[test]
    fn unrepresentable_ttl_is_not_stored() {
        let c = TtlCache::new();
        c.set("k", json!(1), Duration::MAX);
        c.set("big", json!(2), Duration::from_secs(i64::MAX as u64));
        assert!(c.is_empty());
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn expired_entries_miss_and_purge() {
        let c = TtlCache::new();
        c.set("short", json!(1), Duration::from_millis(1));
        c.set("long", json!(2), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(c.get("short"), None);
        c.set("short2", json!(3), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(c.purge_expired(), 1);
        assert_eq!(c.get("long"), Some(json!(2)));
    }

    #[test]
    fn no_cache_never_hits() {
        let c = NoCache;
        c.set("k", json!(1), Duration::from_secs(60));
        assert_eq!(c.get("k"), None);
    }
}
