use super::CounterStore;
use crate::error::{ReqLimitError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info};

/// How often the background task started by `start_purging` sweeps
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process counter store
///
/// Counts are not shared between processes. Expired entries are treated as
/// absent and replaced on the next increment. Windows nobody touches again
/// stay in the map until `purge_expired` runs, so long-lived stores should
/// be swept with `start_purging`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, Counter>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys, expired or not
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Current count for `key`, ignoring expired windows
    pub fn count(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.counters
            .get(key)
            .filter(|counter| !counter.is_expired(now))
            .map(|counter| counter.count)
    }

    /// Remaining lifetime of the window at `key`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.counters
            .get(key)
            .and_then(|counter| counter.expires_at)
            .filter(|at| *at > now)
            .map(|at| at - now)
    }

    /// Drop every expired window
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now));
        let purged = before.saturating_sub(self.counters.len());
        if purged > 0 {
            debug!("Purged {} expired windows", purged);
        }
        purged
    }

    /// Sweep expired windows every `every` on a background task.
    ///
    /// The task holds a weak reference and stops once the store is closed or
    /// dropped. Abort the returned handle to stop it earlier.
    pub fn start_purging(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut purge_interval = interval(every);
            info!(interval_secs = every.as_secs(), "Started expired window purging");

            loop {
                purge_interval.tick().await;

                let Some(live) = store.upgrade() else {
                    break;
                };
                if live.is_closed() {
                    break;
                }
                live.purge_expired();
            }

            debug!("Stopped expired window purging");
        })
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn incr_and_expire(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        if self.is_closed() {
            return Err(ReqLimitError::Store("Memory store is closed".to_string()));
        }

        let now = Instant::now();

        // The shard lock held by the entry makes increment-and-expire atomic.
        let mut entry = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });

        if entry.is_expired(now) {
            *entry = Counter {
                count: 0,
                expires_at: None,
            };
        }

        entry.count += 1;
        if entry.count == 1 {
            entry.expires_at = Some(now + Duration::from_secs(ttl_secs));
        }

        Ok(entry.count)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.counters.clear();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
