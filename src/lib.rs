//! Adaptive Cache - A self-tuning in-process cache
//!
//! Adaptive TTLs from access patterns, probabilistic early refresh, per-key
//! learned utility and utility-aware eviction, with an optional HTTP façade.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::AdaptiveCache;
pub use config::{CacheConfig, Config};
pub use tasks::spawn_cleanup_task;
