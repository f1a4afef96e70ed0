//! Cache Statistics Module
//!
//! Request counters, learning counters and the global prediction-accuracy
//! moving average.

use serde::Serialize;

/// Weight of the newest sample in the prediction-accuracy EMA.
const ACCURACY_EMA_ALPHA: f64 = 0.1;

// == Stats Collector ==
/// Mutable counters owned by the engine.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Incremented on every `set`
    pub adaptations_made: u64,
    /// Incremented on every model update
    pub learning_cycles: u64,
    pub evictions: u64,
    /// Reads of unexpired rows answered as misses by the early refresh draw
    pub early_refreshes: u64,
    /// Rows dropped because their TTL elapsed
    pub expirations: u64,
    /// EMA of `1 - |target - prediction|`
    pub prediction_accuracy: f64,
}

impl StatsCollector {
    // == Constructor ==
    /// Creates a new collector with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn record_adaptation(&mut self) {
        self.adaptations_made += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_early_refresh(&mut self) {
        self.early_refreshes += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Record Prediction ==
    /// Counts a learning cycle and folds its outcome into the accuracy EMA.
    pub fn record_prediction(&mut self, target: f64, prediction: f64) {
        self.learning_cycles += 1;
        let sample = 1.0 - (target - prediction).abs();
        if sample.is_finite() {
            self.prediction_accuracy =
                ACCURACY_EMA_ALPHA * sample + (1.0 - ACCURACY_EMA_ALPHA) * self.prediction_accuracy;
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Statistics ==
/// Point-in-time view returned by `get_statistics`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatistics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub models_count: usize,
    pub tracked_patterns: usize,
    pub prediction_accuracy: f64,
    pub average_model_accuracy: f64,
    pub adaptations_made: u64,
    pub learning_cycles: u64,
    pub evictions: u64,
    pub early_refreshes: u64,
    pub expirations: u64,
    pub eviction_strategy: String,
}
