//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by every store.
///
/// All counters are atomic and can be safely accessed from multiple threads.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Snapshots or resource sets accepted.
    updates_accepted: AtomicU64,
    /// Snapshots or resources refused.
    updates_rejected: AtomicU64,
    /// Fetches that returned a response.
    fetch_hits: AtomicU64,
    /// Fetches with nothing new to return.
    fetch_misses: AtomicU64,
    /// Watch notifications delivered.
    notifications_sent: AtomicU64,
}

impl CacheStats {
    /// Create new cache statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted update.
    #[inline]
    pub fn record_accepted(&self) {
        self.updates_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected update.
    #[inline]
    pub fn record_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch that produced a response.
    #[inline]
    pub fn record_hit(&self) {
        self.fetch_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch that produced nothing.
    #[inline]
    pub fn record_miss(&self) {
        self.fetch_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record notifications sent.
    #[inline]
    pub fn record_notifications(&self, count: usize) {
        self.notifications_sent
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Accepted updates.
    #[inline]
    pub fn updates_accepted(&self) -> u64 {
        self.updates_accepted.load(Ordering::Relaxed)
    }

    /// Rejected updates.
    #[inline]
    pub fn updates_rejected(&self) -> u64 {
        self.updates_rejected.load(Ordering::Relaxed)
    }

    /// Fetch hits.
    #[inline]
    pub fn fetch_hits(&self) -> u64 {
        self.fetch_hits.load(Ordering::Relaxed)
    }

    /// Fetch misses.
    #[inline]
    pub fn fetch_misses(&self) -> u64 {
        self.fetch_misses.load(Ordering::Relaxed)
    }

    /// Notifications delivered.
    #[inline]
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.fetch_hits() as f64;
        let total = hits + self.fetch_misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.updates_accepted.store(0, Ordering::Relaxed);
        self.updates_rejected.store(0, Ordering::Relaxed);
        self.fetch_hits.store(0, Ordering::Relaxed);
        self.fetch_misses.store(0, Ordering::Relaxed);
        self.notifications_sent.store(0, Ordering::Relaxed);
    }
}
