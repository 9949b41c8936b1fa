//! Background Expiry Sweeper
//!
//! Items expire lazily: a `get` that observes an expired item removes it.
//! An item that expires and is never read again would stay in memory for the
//! lifetime of the process, so the server can optionally run this sweeper to
//! reclaim it earlier.
//!
//! The sweeper is off unless `--sweep-interval-ms` is non-zero. It never
//! changes what clients observe: an expired item is already treated as
//! absent by every read path.
//!
//! ## Adaptive Frequency
//!
//! If many items are expiring, the sweeper runs more frequently.
//! If none are, it backs off towards `max_interval`.

use crate::storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Interval the sweeper starts with
    pub base_interval: Duration,

    /// Minimum interval between sweeps
    pub min_interval: Duration,

    /// Maximum interval between sweeps
    pub max_interval: Duration,

    /// If this fraction of held items expired in one sweep, speed up
    pub speedup_threshold: f64,
}

impl ExpiryConfig {
    /// Builds a configuration around the given base interval.
    pub fn with_interval(base_interval: Duration) -> Self {
        Self {
            base_interval,
            min_interval: (base_interval / 10).max(Duration::from_millis(1)),
            max_interval: base_interval * 10,
            speedup_threshold: 0.25,
        }
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self::with_interval(Duration::from_millis(100))
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the sweeper as a background task on the current runtime.
    pub fn start(store: Arc<MemoryStore>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.base_interval.as_millis() as u64,
            "Background expiry sweeper started"
        );
        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Stops the sweeper. Called automatically on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    store: Arc<MemoryStore>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let held = store.len();
        let expired = store.cleanup_expired();

        if held > 0 && expired as f64 / held as f64 > config.speedup_threshold {
            current_interval = (current_interval / 2).max(config.min_interval);
        } else if expired == 0 {
            current_interval = (current_interval * 2).min(config.max_interval);
        }

        if expired > 0 {
            debug!(
                expired = expired,
                remaining = store.len(),
                next_sweep_ms = current_interval.as_millis() as u64,
                "Expired items cleaned up"
            );
        } else {
            trace!(next_sweep_ms = current_interval.as_millis() as u64, "Nothing to sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CacheStore, Item};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_sweeper_cleans_expired_items() {
        let store = Arc::new(MemoryStore::new());

        for i in 0..10 {
            store.set(
                Bytes::from(format!("key{}", i)),
                Item::with_ttl(Bytes::from("value"), 0, Duration::from_millis(50)),
            );
        }
        store.set(Bytes::from("persistent"), Item::new(Bytes::from("value"), 0, 0));
        assert_eq!(store.len(), 11);

        let _sweeper = ExpirySweeper::start(
            Arc::clone(&store),
            ExpiryConfig::with_interval(Duration::from_millis(10)),
        );

        tokio::time::sleep(Duration::from_millis(300)).await;

        // Purged without any read touching them
        assert_eq!(store.len(), 1);
        assert!(store.get(b"persistent").is_some());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let store = Arc::new(MemoryStore::new());

        {
            let _sweeper = ExpirySweeper::start(
                Arc::clone(&store),
                ExpiryConfig::with_interval(Duration::from_millis(10)),
            );
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        store.set(
            Bytes::from("key"),
            Item::with_ttl(Bytes::from("value"), 0, Duration::from_millis(10)),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nobody swept it; only the lazy path removes it
        assert_eq!(store.len(), 1);
        assert!(store.get(b"key").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_config_bounds() {
        let config = ExpiryConfig::with_interval(Duration::from_millis(100));
        assert_eq!(config.min_interval, Duration::from_millis(10));
        assert_eq!(config.max_interval, Duration::from_secs(1));

        let tiny = ExpiryConfig::with_interval(Duration::from_millis(5));
        assert_eq!(tiny.min_interval, Duration::from_millis(1));
    }
}
