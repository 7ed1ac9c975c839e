//! Periodic expiry sweep.
//!
//! # Responsibilities
//! - Periodically drop expired routing cache entries
//! - Stop cleanly on shutdown

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::routing::cache::RoutingCache;

pub struct CacheSweeper {
    cache: RoutingCache,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: RoutingCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Cache sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing can be expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.cache.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.cache.len(), "Swept expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
