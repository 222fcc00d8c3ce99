//! Last-stored timestamps per scope
//!
//! Lookups never insert: a missing key falls back to the caller-supplied
//! default. With a capacity, the least recently stored scope is evicted once
//! the map is full.

use crate::types::ScopeKey;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

/// Recency map from scope to the last time a request of that scope was stored
pub struct LastSeen {
    entries: LruCache<ScopeKey, DateTime<Utc>>,
}

impl LastSeen {
    /// Create a map holding at most `capacity` scopes
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Create a map that never evicts
    pub fn unbounded() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    /// Create from an optional capacity (`None` = unbounded)
    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        match capacity {
            Some(cap) => Self::bounded(cap),
            None => Self::unbounded(),
        }
    }

    /// Explicitly recorded timestamp, if any
    pub fn get(&self, key: &ScopeKey) -> Option<DateTime<Utc>> {
        // peek: reads must not reorder eviction
        self.entries.peek(key).copied()
    }

    /// Timestamp for `key`, or `default` when it was never recorded
    pub fn get_or(&self, key: &ScopeKey, default: DateTime<Utc>) -> DateTime<Utc> {
        self.get(key).unwrap_or(default)
    }

    /// Record `at` for `key`
    ///
    /// Never moves an existing timestamp backwards. Returns the stored value.
    pub fn record(&mut self, key: ScopeKey, at: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.entries.peek(&key) {
            Some(previous) if *previous > at => *previous,
            _ => at,
        };

        if let Some((evicted, last)) = self.entries.push(key, stamp) {
            // push also returns the replaced entry for an existing key
            if self.entries.peek(&evicted).is_none() {
                debug!("Evicted recency entry for {} (last stored {})", evicted, last);
            }
        }
        stamp
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of tracked scopes, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        let cap = self.entries.cap().get();
        (cap != usize::MAX).then_some(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(name: &str) -> ScopeKey {
        ScopeKey::Named(name.to_string())
    }

    #[test]
    fn test_missing_key_uses_default_without_inserting() {
        let map = LastSeen::unbounded();
        let default = Utc::now();

        assert_eq!(map.get_or(&key("a"), default), default);
        assert!(map.get(&key("a")).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_record_and_update() {
        let mut map = LastSeen::unbounded();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(30);

        map.record(key("a"), t0);
        assert_eq!(map.get(&key("a")), Some(t0));

        map.record(key("a"), t1);
        assert_eq!(map.get(&key("a")), Some(t1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_record_never_moves_backwards() {
        let mut map = LastSeen::unbounded();
        let t1 = Utc::now();
        let t0 = t1 - Duration::seconds(10);

        map.record(key("a"), t1);
        let stored = map.record(key("a"), t0);

        assert_eq!(stored, t1);
        assert_eq!(map.get(&key("a")), Some(t1));
    }

    #[test]
    fn test_bounded_evicts_least_recently_stored() {
        let mut map = LastSeen::bounded(NonZeroUsize::new(2).unwrap());
        let t = Utc::now();

        map.record(key("a"), t);
        map.record(key("b"), t + Duration::seconds(1));
        // Reading "a" must not protect it from eviction
        let _ = map.get(&key("a"));
        map.record(key("c"), t + Duration::seconds(2));

        assert_eq!(map.len(), 2);
        assert!(map.get(&key("a")).is_none());
        assert!(map.get(&key("b")).is_some());
        assert!(map.get(&key("c")).is_some());
    }

    #[test]
    fn test_restore_refreshes_eviction_order() {
        let mut map = LastSeen::bounded(NonZeroUsize::new(2).unwrap());
        let t = Utc::now();

        map.record(key("a"), t);
        map.record(key("b"), t);
        map.record(key("a"), t + Duration::seconds(1));
        map.record(key("c"), t + Duration::seconds(2));

        assert!(map.get(&key("a")).is_some());
        assert!(map.get(&key("b")).is_none());
    }

    #[test]
    fn test_capacity() {
        assert_eq!(LastSeen::unbounded().capacity(), None);
        assert_eq!(
            LastSeen::bounded(NonZeroUsize::new(8).unwrap()).capacity(),
            Some(8)
        );
        assert_eq!(LastSeen::with_capacity(None).capacity(), None);
    }

    #[test]
    fn test_unknown_key_is_tracked_like_any_other() {
        let mut map = LastSeen::unbounded();
        let t = Utc::now();
        map.record(ScopeKey::Unknown, t);
        assert_eq!(map.get(&ScopeKey::Unknown), Some(t));
    }
}
