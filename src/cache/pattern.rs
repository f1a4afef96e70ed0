//! Access Pattern Module
//!
//! Per-key access history: timestamps, bounded inter-access intervals, and the
//! frequency and regularity scores derived from them. Patterns outlive cache
//! entries so eviction does not erase what has been learned about a key.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::cache::MAX_INTERVALS;
use crate::clock::seconds_between;

/// Regularity reported when there are too few intervals to judge.
const NEUTRAL_REGULARITY: f64 = 0.5;

// == Access Pattern ==
/// Observed access history of a single key.
#[derive(Debug, Clone)]
pub struct AccessPattern {
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub access_count: u64,
    /// Most recent inter-access gaps in seconds, oldest first
    pub intervals: VecDeque<f64>,
}

impl AccessPattern {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            first_access: now,
            last_access: now,
            access_count: 1,
            intervals: VecDeque::new(),
        }
    }

    fn record(&mut self, now: DateTime<Utc>) {
        let interval = seconds_between(now, self.last_access).max(0.0);
        if self.intervals.len() == MAX_INTERVALS {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
        self.access_count += 1;
        self.last_access = now;
    }

    /// Accesses per second since the first access.
    ///
    /// Elapsed time is floored at one second so a burst at a single instant
    /// yields the raw count instead of dividing by zero.
    pub fn frequency(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = seconds_between(now, self.first_access).max(1.0);
        self.access_count as f64 / elapsed
    }

    /// Inverse coefficient of variation of the intervals, in [0, 1].
    pub fn regularity(&self) -> f64 {
        if self.intervals.len() < 2 {
            return NEUTRAL_REGULARITY;
        }
        let n = self.intervals.len() as f64;
        let mean = self.intervals.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return NEUTRAL_REGULARITY;
        }
        let variance = self
            .intervals
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / n;
        let score = 1.0 / (1.0 + variance.sqrt() / mean);
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            NEUTRAL_REGULARITY
        }
    }

    /// Mean of the last `window` intervals, or None without any.
    pub fn recent_mean_interval(&self, window: usize) -> Option<f64> {
        let take = self.intervals.len().min(window);
        if take == 0 {
            return None;
        }
        let sum: f64 = self.intervals.iter().rev().take(take).sum();
        Some(sum / take as f64)
    }
}

// == Access Pattern Tracker ==
/// Access patterns for every key ever read through the engine.
#[derive(Debug, Default)]
pub struct AccessPatternTracker {
    patterns: HashMap<String, AccessPattern>,
}

impl AccessPatternTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Access ==
    /// Records an access to `key` at `now`.
    pub fn record_access(&mut self, key: &str, now: DateTime<Utc>) {
        match self.patterns.get_mut(key) {
            Some(pattern) => pattern.record(now),
            None => {
                self.patterns.insert(key.to_string(), AccessPattern::new(now));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AccessPattern> {
        self.patterns.get(key)
    }

    /// Accesses per second for `key`, 0 when unknown.
    pub fn frequency(&self, key: &str, now: DateTime<Utc>) -> f64 {
        self.patterns
            .get(key)
            .map_or(0.0, |pattern| pattern.frequency(now))
    }

    /// Regularity of `key`'s intervals, 0.5 when unknown.
    pub fn regularity(&self, key: &str) -> f64 {
        self.patterns
            .get(key)
            .map_or(NEUTRAL_REGULARITY, AccessPattern::regularity)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}
