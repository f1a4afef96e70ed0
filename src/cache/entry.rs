//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::clock::seconds_between;

/// Caller-supplied side data attached to a read or write, used as model features.
pub type Context = HashMap<String, serde_json::Value>;

// == Cache Entry ==
/// A single cached value with its lifetime and usage metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Lifetime in seconds, counted from `created_at`
    pub ttl_seconds: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// `created_at + ttl_seconds`
    pub expiry: DateTime<Utc>,
    /// Time of the most recent hit (or creation)
    pub last_access: DateTime<Utc>,
    /// Number of hits served while this entry lived
    pub access_count: u64,
    /// Side data supplied with the write
    pub context: Context,
    /// Last utility score computed for this entry, in [0, 1]
    pub predicted_utility: f64,
    /// Seconds the loader took to produce the value (0 when written directly)
    pub compute_cost: f64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry living `ttl_seconds` from `now`.
    pub fn new(value: V, ttl_seconds: u64, now: DateTime<Utc>, context: Context) -> Self {
        Self {
            value,
            ttl_seconds,
            created_at: now,
            expiry: now + Duration::seconds(ttl_seconds as i64),
            last_access: now,
            access_count: 0,
            context,
            predicted_utility: 0.5,
            compute_cost: 0.0,
        }
    }

    /// Sets the initial utility score, keeping it inside [0, 1].
    pub fn with_utility(mut self, utility: f64) -> Self {
        self.predicted_utility = sanitize_unit(utility);
        self
    }

    /// Records how long the value took to compute.
    pub fn with_compute_cost(mut self, seconds: f64) -> Self {
        self.compute_cost = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once `now >= expiry`, so a read
    /// landing exactly on the expiry instant is already a miss.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    // == Time To Live ==
    /// Returns the remaining lifetime in seconds, or 0 once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.expiry, now).max(0.0)
    }

    /// Seconds since the last hit.
    pub fn idle_secs(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(now, self.last_access).max(0.0)
    }

    // == Touch ==
    /// Records a hit.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_access = now;
    }

    /// Replaces the stored utility score.
    pub fn set_utility(&mut self, utility: f64) {
        self.predicted_utility = sanitize_unit(utility);
    }
}

/// Maps non-finite scores to the neutral 0.5 and clamps the rest to [0, 1].
fn sanitize_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}
