//! Concurrent holding area for danmaku awaiting dispatch.
//!
//! Producers on UI or network threads insert items at any time; the dispatch
//! worker periodically drains everything that has come due. Items are ordered
//! by due time with insertion order as the tie-break. An item that has been
//! drained once is gone for good: there is no re-insertion path, which is
//! what makes double dispatch impossible by construction.

use crate::item::DanmakuItem;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Ordering key: due time first, then arrival sequence for the FIFO tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PoolKey {
    due: Duration,
    seq: u64,
}

/// Thread-safe ordered multiset of pending items.
///
/// A single lock guards the map, so `clear` is atomic against any in-flight
/// `offer`/`offer_all`: an item is either present after the clear or was never
/// added, never silently half-inserted.
pub struct DanmakuPool {
    items: Mutex<BTreeMap<PoolKey, DanmakuItem>>,
    seq: AtomicU64,
}

impl DanmakuPool {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Insert one item. O(log n).
    pub fn offer(&self, item: DanmakuItem) {
        let key = PoolKey {
            due: item.offset,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        self.items.lock().insert(key, item);
    }

    /// Bulk insert under a single lock acquisition.
    pub fn offer_all(&self, items: impl IntoIterator<Item = DanmakuItem>) {
        let mut guard = self.items.lock();
        for item in items {
            let key = PoolKey {
                due: item.offset,
                seq: self.seq.fetch_add(1, Ordering::Relaxed),
            };
            guard.insert(key, item);
        }
    }

    /// Atomically remove and return every item with `offset <= position`,
    /// in non-decreasing due order (insertion order among equal due times).
    pub fn drain_due(&self, position: Duration) -> Vec<DanmakuItem> {
        let mut guard = self.items.lock();
        let mut due = Vec::new();
        while let Some((key, _)) = guard.first_key_value() {
            if key.due > position {
                break;
            }
            let (_, item) = guard.pop_first().expect("peeked entry must exist");
            due.push(item);
        }
        due
    }

    /// Atomically discard everything.
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Default for DanmakuPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn item(text: &str, offset_ms: u64) -> DanmakuItem {
        DanmakuItem::new(text, Duration::from_millis(offset_ms), 100.0, 20.0)
    }

    #[test]
    fn drain_returns_only_due_items_in_order() {
        let pool = DanmakuPool::new();
        pool.offer(item("late", 500));
        pool.offer(item("first", 10));
        pool.offer(item("second", 200));

        let due = pool.drain_due(Duration::from_millis(250));
        let texts: Vec<&str> = due.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn equal_due_times_drain_in_insertion_order() {
        let pool = DanmakuPool::new();
        pool.offer(item("a", 100));
        pool.offer(item("b", 100));
        pool.offer(item("c", 100));

        let due = pool.drain_due(Duration::from_millis(100));
        let texts: Vec<&str> = due.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn drained_items_never_reappear() {
        let pool = DanmakuPool::new();
        pool.offer(item("once", 10));
        assert_eq!(pool.drain_due(Duration::from_millis(10)).len(), 1);
        assert!(pool.drain_due(Duration::from_millis(10)).is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn boundary_is_inclusive() {
        let pool = DanmakuPool::new();
        pool.offer(item("edge", 100));
        assert!(pool.drain_due(Duration::from_millis(99)).is_empty());
        assert_eq!(pool.drain_due(Duration::from_millis(100)).len(), 1);
    }

    #[test]
    fn offer_all_is_equivalent_to_repeated_offer() {
        let pool = DanmakuPool::new();
        pool.offer_all(vec![item("x", 30), item("y", 10), item("z", 20)]);
        let due = pool.drain_due(Duration::from_millis(30));
        let texts: Vec<&str> = due.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["y", "z", "x"]);
    }

    #[test]
    fn clear_empties_the_pool() {
        let pool = DanmakuPool::new();
        pool.offer_all(vec![item("a", 1), item("b", 2)]);
        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let pool = Arc::new(DanmakuPool::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let pool = pool.clone();
            handles.push(thread::spawn(move || {
                for i in 0..250u64 {
                    pool.offer(item("x", t * 1000 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.len(), 1000);

        let due = pool.drain_due(Duration::from_millis(10_000));
        assert_eq!(due.len(), 1000);
        // Non-decreasing due order across every producer interleaving.
        for pair in due.windows(2) {
            assert!(pair[0].offset <= pair[1].offset);
        }
    }

    #[test]
    fn drains_race_cleanly_with_producers() {
        let pool = Arc::new(DanmakuPool::new());
        let producer = {
            let pool = pool.clone();
            thread::spawn(move || {
                for i in 0..500u64 {
                    pool.offer(item("p", i));
                }
            })
        };
        let mut total = 0;
        for _ in 0..50 {
            total += pool.drain_due(Duration::from_millis(500)).len();
            thread::yield_now();
        }
        producer.join().unwrap();
        total += pool.drain_due(Duration::from_millis(500)).len();
        assert_eq!(total, 500);
    }
}
