//! Dispatch counters and snapshots.
//!
//! Counters are plain relaxed atomics bumped on the worker's hot path;
//! snapshots fold them together with the pool depth and clock position into a
//! serializable record for logs, feeds, and tests.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running totals owned by the dispatcher, readable from any thread.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    /// Items forwarded to the renderer.
    pub dispatched: AtomicU64,
    /// Due items dropped because no lane was free.
    pub collisions: AtomicU64,
    /// Pool items discarded by a seek because their due time was skipped over.
    pub seek_skipped: AtomicU64,
    /// Items pulled out of the pool, placed or not.
    pub drained: AtomicU64,
}

impl DispatchCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_seek_skipped(&self, count: u64) {
        self.seek_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_drained(&self, count: u64) {
        self.drained.fetch_add(count, Ordering::Relaxed);
    }

    /// Fold the counters into a snapshot.
    pub fn snapshot(&self, pending: usize, position: Duration) -> DispatchSnapshot {
        DispatchSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            seek_skipped: self.seek_skipped.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            pending,
            position_ms: position.as_millis() as u64,
        }
    }
}

/// Point-in-time view of the engine, serialized for the stats feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub dispatched: u64,
    pub collisions: u64,
    pub seek_skipped: u64,
    pub drained: u64,
    /// Items still waiting in the pool.
    pub pending: usize,
    /// Playback position at snapshot time, in milliseconds.
    pub position_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let counters = DispatchCounters::new();
        counters.record_dispatched();
        counters.record_dispatched();
        counters.record_collision();
        counters.record_drained(3);
        counters.record_seek_skipped(5);

        let snapshot = counters.snapshot(7, Duration::from_millis(1234));
        assert_eq!(snapshot.dispatched, 2);
        assert_eq!(snapshot.collisions, 1);
        assert_eq!(snapshot.drained, 3);
        assert_eq!(snapshot.seek_skipped, 5);
        assert_eq!(snapshot.pending, 7);
        assert_eq!(snapshot.position_ms, 1234);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let counters = DispatchCounters::new();
        counters.record_dispatched();
        let snapshot = counters.snapshot(0, Duration::from_secs(2));
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DispatchSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
