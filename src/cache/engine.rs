//! Adaptive Cache Engine
//!
//! Ties the store, access tracking, TTL derivation, utility learning, early
//! refresh and eviction together behind a get/set façade.

use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::flight::{Role, SingleFlight};
use crate::cache::{
    AccessPatternTracker, AdaptiveTtlCalculator, CacheEntry, CacheStatistics, CacheStore,
    Context, EarlyRefreshPolicy, EvictionManager, StatsCollector, UtilityPredictor,
    MAX_KEY_LENGTH, MAX_TTL,
};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Everything guarded by the engine lock.
struct EngineState<V> {
    store: CacheStore<V>,
    patterns: AccessPatternTracker,
    predictor: UtilityPredictor,
    stats: StatsCollector,
    rng: StdRng,
}

/// Result of the read path before any loader runs.
enum Lookup<V> {
    Hit(V),
    /// Unexpired row the early refresh draw picked for recompute
    Refresh(V),
    Miss,
}

// == Entry Snapshot ==
/// Read-only view of a live entry's metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub ttl_seconds: u64,
    pub remaining_secs: f64,
    pub access_count: u64,
    pub predicted_utility: f64,
    pub compute_cost: f64,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

// == Adaptive Cache ==
/// Self-tuning in-process cache.
///
/// All state sits behind one lock that is never held while a loader runs. Loads
/// are coalesced per key: concurrent misses on the same key wait for a single
/// loader call instead of each recomputing the value.
///
/// # Example
/// ```
/// use adaptive_cache::cache::{AdaptiveCache, Context};
/// use adaptive_cache::config::CacheConfig;
///
/// let cache: AdaptiveCache<String> = AdaptiveCache::new(CacheConfig::default()).unwrap();
/// let value = cache
///     .get_or_load("greeting", &Context::new(), || Ok::<_, std::io::Error>("hello".to_string()))
///     .unwrap();
/// assert_eq!(value, "hello");
/// assert!(cache.has("greeting"));
/// ```
pub struct AdaptiveCache<V, C: Clock = SystemClock> {
    state: Mutex<EngineState<V>>,
    flights: SingleFlight,
    ttl: AdaptiveTtlCalculator,
    refresh: EarlyRefreshPolicy,
    eviction: EvictionManager,
    config: CacheConfig,
    clock: C,
}

impl<V: Clone> AdaptiveCache<V, SystemClock> {
    /// Creates an engine on the system clock. Fails if `config` is invalid.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<V: Clone, C: Clock> AdaptiveCache<V, C> {
    // == Constructor ==
    /// Creates an engine on a custom clock (useful for testing).
    pub fn with_clock(config: CacheConfig, clock: C) -> Result<Self> {
        config.validate()?;
        info!(
            "Adaptive cache initialized: max_cache_size={}, default_ttl={}s, strategy={}, learning_window={}",
            config.max_cache_size,
            config.default_ttl,
            config.eviction_strategy,
            config.learning_window
        );

        Ok(Self {
            state: Mutex::new(EngineState {
                store: CacheStore::new(),
                patterns: AccessPatternTracker::new(),
                predictor: UtilityPredictor::new(config.learning_window),
                stats: StatsCollector::new(),
                rng: StdRng::from_entropy(),
            }),
            flights: SingleFlight::new(),
            ttl: AdaptiveTtlCalculator::new(config.default_ttl, config.adaptation_threshold),
            refresh: EarlyRefreshPolicy::new(config.refresh_beta),
            eviction: EvictionManager::new(config.eviction_strategy, config.max_cache_size),
            config,
            clock,
        })
    }

    /// Replaces the early refresh random source with a seeded one.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.state.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the cached value, or None on a miss.
    ///
    /// A row picked for early refresh is reported as a miss even though it is
    /// still stored; the caller is expected to recompute and `set` it.
    pub fn get(&self, key: &str, context: &Context) -> Option<V> {
        if validate_key(key).is_err() {
            return None;
        }
        match self.lookup(key, context) {
            Lookup::Hit(value) => Some(value),
            Lookup::Refresh(_) | Lookup::Miss => None,
        }
    }

    // == Get Or Load ==
    /// Returns the cached value or computes it with `loader`.
    ///
    /// On a miss or early refresh the loader runs on the calling thread and its
    /// value is stored under an adaptive TTL. A loader error is returned as-is
    /// and leaves the existing row untouched. Concurrent callers for the same
    /// key wait for the running loader; during an early refresh they are served
    /// the still-valid old value instead.
    pub fn get_or_load<F, E>(
        &self,
        key: &str,
        context: &Context,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        // Uncacheable key: nothing to track or coalesce on
        if validate_key(key).is_err() {
            return loader();
        }

        let stale = match self.lookup(key, context) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Refresh(stale) => Some(stale),
            Lookup::Miss => None,
        };

        match self.flights.join(key) {
            Role::Leader(guard) => {
                // A peer may have stored the value between our lookup and join
                if stale.is_none() {
                    if let Some(value) = self.peek(key) {
                        return Ok(value);
                    }
                }
                let result = self.load_and_store(key, context, loader);
                drop(guard);
                result
            }
            Role::Follower(follower) => {
                if let Some(stale) = stale {
                    return Ok(stale);
                }
                follower.wait();
                match self.peek(key) {
                    Some(value) => Ok(value),
                    // The peer's loader failed: try our own
                    None => self.load_and_store(key, context, loader),
                }
            }
        }
    }

    // == Set ==
    /// Stores `value`, overwriting any existing row.
    ///
    /// Without an explicit `ttl` the lifetime is derived from the key's access
    /// pattern and lies within [`MIN_TTL`](crate::cache::MIN_TTL)..=[`MAX_TTL`].
    /// Explicit TTLs must be within `1..=MAX_TTL` seconds. Returns the TTL the
    /// row was stored with.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<u64>,
        context: Context,
    ) -> Result<u64> {
        self.store_entry(key.into(), value, ttl, context, 0.0)
    }

    // == Delete ==
    /// Removes the row for `key`. Returns true if one existed.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().store.remove(key).is_some()
    }

    // == Has ==
    /// True if a live row exists; an expired row is removed on the way.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.store.expire_if_stale(key, now) {
            state.stats.record_expirations(1);
        }
        state.store.contains(key)
    }

    // == Clear ==
    /// Drops all rows, access patterns and models, and zeroes the statistics.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.store.clear();
        state.patterns.clear();
        state.predictor.clear();
        state.stats.reset();
        info!("Adaptive cache cleared");
    }

    // == Statistics ==
    pub fn get_statistics(&self) -> CacheStatistics {
        let state = self.state.lock();
        let stats = &state.stats;
        CacheStatistics {
            total_requests: stats.total_requests,
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            hit_rate: stats.hit_rate(),
            cache_size: state.store.len(),
            max_cache_size: self.eviction.max_size(),
            models_count: state.predictor.len(),
            tracked_patterns: state.patterns.len(),
            prediction_accuracy: stats.prediction_accuracy,
            average_model_accuracy: state.predictor.average_accuracy(),
            adaptations_made: stats.adaptations_made,
            learning_cycles: stats.learning_cycles,
            evictions: stats.evictions,
            early_refreshes: stats.early_refreshes,
            expirations: stats.expirations,
            eviction_strategy: self.eviction.strategy().to_string(),
        }
    }

    // == Cleanup Expired ==
    /// Removes every expired row. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let removed = state.store.purge_expired(now);
        state.stats.record_expirations(removed);
        removed
    }

    // == Introspection ==
    /// Live value for `key` without recording an access or training the model.
    pub fn peek(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .store
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Metadata of the live row for `key`.
    pub fn inspect(&self, key: &str) -> Option<EntrySnapshot> {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .store
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| EntrySnapshot {
                ttl_seconds: entry.ttl_seconds,
                remaining_secs: entry.remaining_secs(now),
                access_count: entry.access_count,
                predicted_utility: entry.predicted_utility,
                compute_cost: entry.compute_cost,
                created_at: entry.created_at,
                last_access: entry.last_access,
            })
    }

    /// TTL a `set` without explicit TTL would assign to `key` right now.
    pub fn adaptive_ttl(&self, key: &str) -> u64 {
        let state = self.state.lock();
        self.ttl.compute(state.patterns.get(key))
    }

    pub fn access_frequency(&self, key: &str) -> f64 {
        let now = self.clock.now();
        self.state.lock().patterns.frequency(key, now)
    }

    pub fn regularity(&self, key: &str) -> f64 {
        self.state.lock().patterns.regularity(key)
    }

    /// Current model prediction for reading `key` with `context`.
    pub fn predicted_utility(&self, key: &str, context: &Context) -> f64 {
        let now = self.clock.now();
        let state = self.state.lock();
        let frequency = state.patterns.frequency(key, now);
        state.predictor.predict_utility(key, context, now, frequency)
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    // == Read Path ==
    fn lookup(&self, key: &str, context: &Context) -> Lookup<V> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state.stats.record_request();
        state.patterns.record_access(key, now);
        let frequency = state.patterns.frequency(key, now);

        if state.store.expire_if_stale(key, now) {
            state.stats.record_expirations(1);
        }

        let (lookup, ttl) = match state.store.get_mut(key, now) {
            Some(entry) => {
                let remaining = entry.remaining_secs(now);
                if self
                    .refresh
                    .should_refresh(remaining, entry.compute_cost, frequency, &mut state.rng)
                {
                    (Lookup::Refresh(entry.value.clone()), entry.ttl_seconds)
                } else {
                    entry.touch(now);
                    (Lookup::Hit(entry.value.clone()), entry.ttl_seconds)
                }
            }
            None => (Lookup::Miss, self.ttl.compute(state.patterns.get(key))),
        };

        let was_hit = matches!(lookup, Lookup::Hit(_));
        if was_hit {
            state.stats.record_hit();
            state.store.touch(key);
        } else {
            state.stats.record_miss();
        }
        if matches!(lookup, Lookup::Refresh(_)) {
            state.stats.record_early_refresh();
            debug!("Early refresh triggered for key '{}'", key);
        }

        let prediction = state
            .predictor
            .update(key, context, was_hit, now, frequency, ttl);
        let target = if was_hit { 1.0 } else { 0.0 };
        state.stats.record_prediction(target, prediction);

        let utility = state.predictor.predict_utility(key, context, now, frequency);
        if let Some(entry) = state.store.get_mut(key, now) {
            entry.set_utility(utility);
        }

        lookup
    }

    // == Write Path ==
    fn load_and_store<F, E>(
        &self,
        key: &str,
        context: &Context,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let started = Instant::now();
        match loader() {
            Ok(value) => {
                let cost = started.elapsed().as_secs_f64();
                if let Err(err) =
                    self.store_entry(key.to_string(), value.clone(), None, context.clone(), cost)
                {
                    warn!("Loaded value for key '{}' was not cached: {}", key, err);
                }
                Ok(value)
            }
            Err(err) => {
                warn!("Loader failed for key '{}', cached entry left untouched", key);
                Err(err)
            }
        }
    }

    fn store_entry(
        &self,
        key: String,
        value: V,
        ttl: Option<u64>,
        context: Context,
        compute_cost: f64,
    ) -> Result<u64> {
        validate_key(&key)?;
        if let Some(ttl) = ttl {
            if ttl == 0 || ttl > MAX_TTL {
                return Err(CacheError::InvalidRequest(format!(
                    "TTL must be between 1 and {} seconds, got {}",
                    MAX_TTL, ttl
                )));
            }
        }

        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let ttl = ttl.unwrap_or_else(|| self.ttl.compute(state.patterns.get(&key)));
        let frequency = state.patterns.frequency(&key, now);
        let utility = state.predictor.predict_utility(&key, &context, now, frequency);

        if !state.store.contains(&key) && self.eviction.needs_room(state.store.len()) {
            let expired = state.store.purge_expired(now);
            state.stats.record_expirations(expired);
            let evicted = self.eviction.enforce_capacity(&mut state.store, now);
            state.stats.record_evictions(evicted.len());
        }

        let entry = CacheEntry::new(value, ttl, now, context)
            .with_utility(utility)
            .with_compute_cost(compute_cost);
        state.store.insert(key, entry);
        state.stats.record_adaptation();

        Ok(ttl)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
