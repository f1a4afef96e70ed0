//! Cache Module
//!
//! Adaptive in-memory caching: lazy TTL expiry, access-pattern driven TTLs,
//! probabilistic early refresh, per-key learned utility and pluggable eviction.

mod engine;
mod entry;
mod eviction;
mod flight;
mod lru;
mod pattern;
mod predictor;
mod refresh;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use engine::{AdaptiveCache, EntrySnapshot};
pub use entry::{CacheEntry, Context};
pub use eviction::{EvictionManager, EvictionStrategy};
pub use lru::LruTracker;
pub use pattern::{AccessPattern, AccessPatternTracker};
pub use predictor::{FeatureVector, LearningModel, TrainingRecord, UtilityPredictor};
pub use refresh::EarlyRefreshPolicy;
pub use stats::{CacheStatistics, StatsCollector};
pub use store::CacheStore;
pub use ttl::AdaptiveTtlCalculator;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Lower bound for adaptively derived TTLs, in seconds
pub const MIN_TTL: u64 = 60;

/// Upper bound for adaptively derived TTLs, in seconds
pub const MAX_TTL: u64 = 86_400;

/// TTL used when a key has no access history, in seconds
pub const DEFAULT_TTL: u64 = 3_600;

/// Maximum number of inter-access intervals kept per key
pub const MAX_INTERVALS: usize = 100;
