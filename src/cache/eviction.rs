//! Eviction Module
//!
//! Victim selection under capacity pressure. The strategy is fixed by
//! configuration; all three rank the live rows and drop from the front of the
//! ranking until the store is back at 90% of its capacity.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheStore;

// == Eviction Strategy ==
/// Victim ordering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// Oldest `last_access` first
    Lru,
    /// Highest `idle_secs / (1 + predicted_utility)` first
    LruAdaptive,
    /// Lowest `predicted_utility` first
    UtilityBased,
}

impl EvictionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::LruAdaptive => "lru_adaptive",
            EvictionStrategy::UtilityBased => "utility_based",
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lru" => Ok(EvictionStrategy::Lru),
            "lru_adaptive" => Ok(EvictionStrategy::LruAdaptive),
            "utility_based" => Ok(EvictionStrategy::UtilityBased),
            other => Err(format!(
                "unknown eviction strategy '{}', expected lru, lru_adaptive or utility_based",
                other
            )),
        }
    }
}

// == Eviction Manager ==
#[derive(Debug, Clone)]
pub struct EvictionManager {
    strategy: EvictionStrategy,
    max_size: usize,
}

impl EvictionManager {
    pub fn new(strategy: EvictionStrategy, max_size: usize) -> Self {
        Self {
            strategy,
            max_size: max_size.max(1),
        }
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Occupancy the store is trimmed down to: `floor(0.9 * max_size)`.
    pub fn target_size(&self) -> usize {
        self.max_size * 9 / 10
    }

    /// True when adding one more row would push the store past capacity.
    pub fn needs_room(&self, current_len: usize) -> bool {
        current_len >= self.max_size
    }

    // == Select Victims ==
    /// Returns up to `count` keys in eviction order.
    pub fn select_victims<V>(
        &self,
        store: &CacheStore<V>,
        now: DateTime<Utc>,
        count: usize,
    ) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }
        let recency = store.recency();
        if self.strategy == EvictionStrategy::Lru {
            return recency.iter_oldest_first().take(count).cloned().collect();
        }

        // Position in recency order, 0 = least recently used; breaks score ties
        let rank: HashMap<&str, usize> = recency
            .iter_oldest_first()
            .enumerate()
            .map(|(i, key)| (key.as_str(), i))
            .collect();

        let mut scored: Vec<(&String, f64, usize)> = store
            .iter()
            .map(|(key, entry)| {
                let score = match self.strategy {
                    EvictionStrategy::UtilityBased => entry.predicted_utility,
                    // negated so that ascending order puts the highest score first
                    _ => -(entry.idle_secs(now) / (1.0 + entry.predicted_utility)),
                };
                let score = if score.is_finite() { score } else { 0.0 };
                let position = rank.get(key.as_str()).copied().unwrap_or(usize::MAX);
                (key, score, position)
            })
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.2.cmp(&b.2),
            other => other,
        });

        scored
            .into_iter()
            .take(count)
            .map(|(key, _, _)| key.clone())
            .collect()
    }

    // == Enforce Capacity ==
    /// Makes room for one new row, trimming the store to [`target_size`].
    ///
    /// Returns the evicted keys; empty when the store was below capacity.
    ///
    /// [`target_size`]: EvictionManager::target_size
    pub fn enforce_capacity<V>(
        &self,
        store: &mut CacheStore<V>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        if !self.needs_room(store.len()) {
            return Vec::new();
        }
        let count = store.len() - self.target_size();
        let victims = self.select_victims(store, now, count);
        for key in &victims {
            store.remove(key);
        }
        debug!(
            "Evicted {} entries using {} strategy",
            victims.len(),
            self.strategy
        );
        victims
    }
}
