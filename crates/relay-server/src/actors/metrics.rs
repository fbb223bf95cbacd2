//! Publisher metrics.
//!
//! Shared atomic counters updated by the event loop and read by logging
//! and tests. Relaxed ordering throughout; the counters are informational
//! and never coordinate control flow.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters for the publisher actor.
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Currently registered subscribers.
    subscribers: AtomicUsize,
    /// Payloads forwarded to the broadcast socket.
    published: AtomicU64,
    /// Heartbeats broadcast.
    heartbeats: AtomicU64,
    /// Per-peer sends that failed and were dropped.
    dropped_sends: AtomicU64,
}

impl PublisherMetrics {
    /// Create a shared metrics handle.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record the current subscriber count.
    pub fn set_subscribers(&self, count: usize) {
        self.subscribers.store(count, Ordering::Relaxed);
    }

    /// Record a forwarded publish payload.
    pub fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a broadcast heartbeat.
    pub fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    /// Record per-peer sends that failed.
    pub fn record_dropped_sends(&self, count: u64) {
        if count > 0 {
            self.dropped_sends.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Currently registered subscribers.
    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.subscribers.load(Ordering::Relaxed)
    }

    /// Payloads forwarded so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Heartbeats broadcast so far.
    #[must_use]
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    /// Failed per-peer sends so far.
    #[must_use]
    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = PublisherMetrics::new();

        metrics.record_publish();
        metrics.record_publish();
        metrics.record_heartbeat();
        metrics.record_dropped_sends(3);
        metrics.record_dropped_sends(0);
        metrics.set_subscribers(2);

        assert_eq!(metrics.published(), 2);
        assert_eq!(metrics.heartbeats(), 1);
        assert_eq!(metrics.dropped_sends(), 3);
        assert_eq!(metrics.subscribers(), 2);
    }

    #[test]
    fn test_fresh_metrics_are_zero() {
        let metrics = PublisherMetrics::new();
        assert_eq!(metrics.subscribers(), 0);
        assert_eq!(metrics.published(), 0);
        assert_eq!(metrics.heartbeats(), 0);
        assert_eq!(metrics.dropped_sends(), 0);
    }
}
