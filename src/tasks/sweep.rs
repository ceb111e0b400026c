//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, whether
//! or not they are ever looked up again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheValue, RequestCache};

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache: RequestCache<serde_json::Value> = RequestCache::new(config.clone());
/// let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V: CacheValue>(cache: RequestCache<V>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            warn!("Expiry sweep disabled: interval must be greater than zero");
            return;
        }

        info!(
            "Starting expiry sweep task with interval of {} ms",
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.sweep_expired().await;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::{ManualClock, RequestOptions};
    use crate::config::CacheConfig;

    fn cache_with_clock(clock: Arc<ManualClock>) -> RequestCache<String> {
        let config = CacheConfig {
            default_ttl: Duration::from_millis(1_000),
            ..CacheConfig::default()
        };
        RequestCache::with_parts(config, clock, None)
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with_clock(clock.clone());

        cache
            .set("expire_soon", "value".to_string(), RequestOptions::new())
            .await;
        clock.advance(Duration::from_millis(1_001));

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(20));

        // Wait for the sweep to run
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(
            cache.entry("expire_soon").await.is_none(),
            "Expired entry should have been swept"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with_clock(clock.clone());

        cache
            .set("long_lived", "value".to_string(), RequestOptions::new())
            .await;
        clock.advance(Duration::from_millis(500));

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.has("long_lived").await, "Valid entry should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_zero_interval_exits_cleanly() {
        let cache = cache_with_clock(Arc::new(ManualClock::new(0)));

        let handle = spawn_sweep_task(cache, Duration::ZERO);
        let result = handle.await;

        assert!(result.is_ok(), "Zero interval must not panic the task");
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache = cache_with_clock(Arc::new(ManualClock::new(0)));

        let handle = spawn_sweep_task(cache, Duration::from_millis(20));

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
