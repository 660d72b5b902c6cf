//! Bounded metric queue
//!
//! Fixed-capacity, order-preserving queue of metrics. When full, the
//! oldest metrics are evicted to make room (drop-oldest, never blocking).
//! Overflow is a silent, counted, lossy event.

use crate::metric::Metric;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe bounded queue of metrics
///
/// `add` appends at the tail, `batch` removes from the head, so relative
/// arrival order is preserved across buffering. Counters track totals for
/// monitoring; dropped metrics are the only observable trace of overflow.
pub struct MetricBuffer {
    metrics: Mutex<VecDeque<Metric>>,
    limit: usize,
    counters: BufferCounters,
}

/// Counters for buffer monitoring
pub struct BufferCounters {
    /// Total metrics added
    pub added: AtomicU64,
    /// Total metrics dropped due to a full buffer
    pub dropped: AtomicU64,
    /// Total metrics removed via batch
    pub batched: AtomicU64,
}

impl Default for BufferCounters {
    fn default() -> Self {
        Self {
            added: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            batched: AtomicU64::new(0),
        }
    }
}

impl MetricBuffer {
    /// Create a new buffer holding at most `limit` metrics
    pub fn new(limit: usize) -> Self {
        Self {
            metrics: Mutex::new(VecDeque::with_capacity(limit.min(1024))),
            limit,
            counters: BufferCounters::default(),
        }
    }

    /// Append metrics in order, evicting the oldest on overflow
    ///
    /// Returns the number of metrics dropped to stay within the limit.
    pub fn add(&self, metrics: impl IntoIterator<Item = Metric>) -> usize {
        let mut queue = self.metrics.lock();
        let mut added = 0u64;
        let mut dropped = 0;

        for metric in metrics {
            if queue.len() >= self.limit {
                queue.pop_front();
                dropped += 1;
            }
            queue.push_back(metric);
            added += 1;
        }

        self.counters.added.fetch_add(added, Ordering::Relaxed);
        if dropped > 0 {
            self.counters
                .dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }

        dropped
    }

    /// Remove and return up to `n` of the oldest metrics, in arrival order
    ///
    /// Returns an empty vec on an empty buffer; never blocks. The batch is
    /// not re-inserted on failure - that is the caller's responsibility.
    pub fn batch(&self, n: usize) -> Vec<Metric> {
        let mut queue = self.metrics.lock();
        let count = n.min(queue.len());
        let batch: Vec<Metric> = queue.drain(..count).collect();

        self.counters
            .batched
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        batch
    }

    /// Current number of buffered metrics
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    /// Maximum number of metrics held
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total metrics ever added
    pub fn total_added(&self) -> u64 {
        self.counters.added.load(Ordering::Relaxed)
    }

    /// Total metrics dropped on overflow
    pub fn total_dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Total metrics removed via batch
    pub fn total_batched(&self) -> u64 {
        self.counters.batched.load(Ordering::Relaxed)
    }
}
