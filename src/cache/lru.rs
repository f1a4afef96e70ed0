//! Recency Module
//!
//! Recency order of live keys. Used directly by the `lru` strategy and as the
//! tie-breaker for the utility-driven strategies.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Orders keys by their last touch.
///
/// Every touch stamps the key with a fresh sequence number. `stamps` maps key to
/// stamp and `order` maps stamp back to key, so touch and remove are
/// logarithmic and oldest-first iteration is an ordered walk of `order`.
#[derive(Debug, Default)]
pub struct LruTracker {
    stamps: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    next_stamp: u64,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as the most recently used.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        match self.stamps.get_mut(key) {
            Some(previous) => {
                self.order.remove(&*previous);
                *previous = stamp;
            }
            None => {
                self.stamps.insert(key.to_string(), stamp);
            }
        }
        self.order.insert(stamp, key.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    /// Iterates keys from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &String> {
        self.order.values()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }
}
