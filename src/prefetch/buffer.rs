//! Bounded, ordered-by-height producer/consumer buffer (spec §4.4, §9).
//!
//! Deliberately not a generic priority queue: the ordering key *is* the
//! height, and that contract is made explicit here rather than left
//! implicit in a `BinaryHeap<Priority>` the way the source code does it.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Duration};

use crate::model::BlockPayload;

struct Inner {
    // The heap orders strictly by height; payloads live in a side map so
    // `BlockPayload` never needs an `Ord` impl of its own.
    heap: BinaryHeap<Reverse<u64>>,
    payloads: HashMap<u64, BlockPayload>,
    heights: HashSet<u64>,
    capacity: usize,
}

/// Multi-producer, single-consumer. Internal synchronization required
/// (spec §5); producers block on `put` when full, the single consumer
/// drains via `try_get` in ascending height order.
pub struct PrefetchBuffer {
    inner: Mutex<Inner>,
    not_full: Notify,
    not_empty: Notify,
}

impl PrefetchBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                payloads: HashMap::new(),
                heights: HashSet::new(),
                capacity,
            }),
            not_full: Notify::new(),
            not_empty: Notify::new(),
        }
    }

    /// Blocks (cooperatively) until there is room, then inserts. A height
    /// already present is a silent no-op — the buffer never stores
    /// duplicate heights.
    pub async fn put(&self, height: u64, payload: BlockPayload) {
        loop {
            {
                let mut guard = self.inner.lock().await;
                if guard.heights.contains(&height) {
                    return;
                }
                if guard.heap.len() < guard.capacity {
                    guard.heap.push(Reverse(height));
                    guard.payloads.insert(height, payload);
                    guard.heights.insert(height);
                    self.not_empty.notify_one();
                    return;
                }
            }
            self.not_full.notified().await;
        }
    }

    /// Pops the minimum-height entry if one becomes available within
    /// `wait`; otherwise returns `None` without blocking further.
    pub async fn try_get(&self, wait: Duration) -> Option<(u64, BlockPayload)> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            {
                let mut guard = self.inner.lock().await;
                if let Some(Reverse(height)) = guard.heap.pop() {
                    guard.heights.remove(&height);
                    let payload = guard
                        .payloads
                        .remove(&height)
                        .expect("heap and payload map are kept in sync");
                    self.not_full.notify_one();
                    return Some((height, payload));
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if timeout(remaining, self.not_empty.notified()).await.is_err() {
                return None;
            }
        }
    }

    /// Heights currently buffered, so producers can skip heights already
    /// in flight.
    pub async fn peek_heights(&self) -> HashSet<u64> {
        self.inner.lock().await.heights.clone()
    }

    /// Drains all entries. Only ever called by the engine between loop
    /// iterations, never concurrently with a drain (spec §5).
    pub async fn clear(&self) {
        let mut guard = self.inner.lock().await;
        guard.heap.clear();
        guard.heights.clear();
        guard.payloads.clear();
        self.not_full.notify_waiters();
    }
}
