//! Cache Store Module
//!
//! Key → entry map with recency tracking and lazy TTL expiration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, LruTracker};

// == Cache Store ==
/// Owns every live [`CacheEntry`].
///
/// Expired rows are never returned: they are dropped the moment a lookup
/// notices them, or in bulk by [`purge_expired`](CacheStore::purge_expired).
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency order of live keys
    lru: LruTracker,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
        }
    }

    // == Insert ==
    /// Stores an entry, replacing any previous row for the key.
    ///
    /// Returns the replaced entry, if any.
    pub fn insert(&mut self, key: String, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        self.lru.touch(&key);
        self.entries.insert(key, entry)
    }

    // == Get ==
    /// Returns the live entry for `key`, dropping it first if it has expired.
    pub fn get_mut(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut CacheEntry<V>> {
        self.expire_if_stale(key, now);
        self.entries.get_mut(key)
    }

    /// Returns the entry without any expiry check or side effect.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// True if a row exists for `key`, expired or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Expire ==
    /// Removes the row for `key` if it has expired. Returns true if a row was removed.
    pub fn expire_if_stale(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            self.remove(key);
        }
        expired
    }

    // == Touch ==
    /// Marks `key` as most recently used.
    pub fn touch(&mut self, key: &str) {
        if self.entries.contains_key(key) {
            self.lru.touch(key);
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru.remove(key);
        }
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove(key);
        }
        expired_keys.len()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    /// Iterates all rows, expired ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<V>)> {
        self.entries.iter()
    }

    /// Recency order of live keys.
    pub fn recency(&self) -> &LruTracker {
        &self.lru
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
