use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use prometheus::Gauge;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::metrics::TRACKED_CREDENTIALS;

/// Sliding-window limiter keyed by credential.
///
/// Each credential owns a deque of the instants at which its calls were
/// admitted. The prune/check/append sequence for one credential runs while the
/// DashMap entry lock is held, so two concurrent calls for the same key can
/// never both see a stale under-budget count.
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    limit: usize,
    window: Duration,
    tracked_gauge: Gauge,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
            tracked_gauge: TRACKED_CREDENTIALS.clone(),
        }
    }

    // Report tracked credentials on `gauge` instead of the global one
    #[cfg(test)]
    pub fn with_gauge(mut self, gauge: Gauge) -> Self {
        self.tracked_gauge = gauge;
        self
    }

    // Admit and record a call for `key`, or reject without recording
    pub fn check_and_record(&self, key: &str) -> bool {
        self.check_and_record_at(key, Instant::now())
    }

    pub fn check_and_record_at(&self, key: &str, now: Instant) -> bool {
        let (admitted, created) = {
            let (mut entry, created) = match self.windows.entry(key.to_string()) {
                Entry::Occupied(e) => (e.into_ref(), false),
                Entry::Vacant(e) => (e.insert(VecDeque::new()), true),
            };

            while let Some(&oldest) = entry.front() {
                if now.saturating_duration_since(oldest) >= self.window {
                    entry.pop_front();
                } else {
                    break;
                }
            }

            if entry.len() >= self.limit {
                (false, created)
            } else {
                entry.push_back(now);
                (true, created)
            }
        };

        // len() locks every shard, so it only runs once the entry is released
        if created {
            self.tracked_gauge.set(self.windows.len() as f64);
        }
        admitted
    }

    // Calls still counted against `key` as of `now`
    #[cfg(test)]
    pub fn in_window_at(&self, key: &str, now: Instant) -> usize {
        self.windows
            .get(key)
            .map(|w| {
                w.iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Drop credentials whose whole window has aged out. Returns how many
    /// entries were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
        let removed = before.saturating_sub(self.windows.len());
        self.tracked_gauge.set(self.windows.len() as f64);
        removed
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    // Background sweeper; abort the handle to tear it down
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            tracing::info!(interval = ?every, "rate window sweeper started");
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked(), "swept idle rate windows");
                }
            }
        })
    }
}
