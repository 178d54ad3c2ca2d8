//! Background expiry sweeper
//!
//! Lazy expiry only removes entries that are read again. The sweeper purges
//! the rest on a fixed interval so memory tracks live entries. It lives as
//! long as the returned [`CacheSweeper`] guard: dropping the guard cancels the
//! task, [`CacheSweeper::shutdown`] also waits for it.

use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Cache;
use crate::resilience::Clock;

/// Guard owning a running sweeper task
#[derive(Debug)]
pub struct CacheSweeper {
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl CacheSweeper {
    /// Returns true while the sweeper task is active
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the sweeper and wait for the task to finish
    pub async fn shutdown(mut self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = ?err, "Cache sweeper task ended abnormally");
            }
        }
        info!("Cache sweeper stopped");
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        if self.is_running() {
            debug!("CacheSweeper dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock + Clone,
{
    /// Spawn a task that calls [`purge_expired`](Cache::purge_expired) every
    /// `interval`
    ///
    /// Missed ticks are skipped rather than replayed. Must be called from
    /// within a tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> CacheSweeper {
        let cancellation = CancellationToken::new();
        let cancel = cancellation.clone();
        let cache = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Cache sweeper cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = cache.len(), "Purged expired cache entries");
                        }
                    }
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "Cache sweeper started");
        CacheSweeper { cancellation, handle: Some(handle), interval }
    }

    /// Spawn a sweeper using the configured `sweep_interval`
    pub fn spawn_default_sweeper(&self) -> CacheSweeper {
        self.spawn_sweeper(self.config().sweep_interval)
    }
}
