//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries so rows
//! nobody reads again do not sit in memory until eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::AdaptiveCache;
use crate::clock::Clock;

/// Spawns a background task that periodically purges expired entries.
///
/// Access patterns and learning models are kept; only rows are removed.
///
/// # Arguments
/// * `cache` - Shared engine
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_cleanup_task<V, C>(
    cache: Arc<AdaptiveCache<V, C>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
    C: Clock,
{
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
