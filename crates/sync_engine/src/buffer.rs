//! Pending absolute-fix queue shared between the fix producer and the synchronizer.
//!
//! Entries are kept in arrival order inside a fixed-capacity `HeapRb`; every operation,
//! including the whole scan-and-drop pass of [`AbsoluteFixBuffer::reconcile`], runs under one
//! mutex so the match / drop / defer decision is atomic with respect to concurrent pushes.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{AbsoluteFix, ContractError, FixBufferConfig, OverflowPolicy};
use ringbuf::{traits::*, HeapRb};
use tracing::{error, trace, warn};

const BUFFER_NAME: &str = "absolute_fix";

/// Result of scanning the buffer for one odometry timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reconciliation {
    /// Fix matched to the odometry sample (oldest in-window entry)
    pub matched: Option<AbsoluteFix>,
    /// Stale fixes popped before the scan stopped
    pub stale_dropped: usize,
    /// Scan stopped on a fix newer than the window
    pub deferred: bool,
    /// Entries left after the scan
    pub pending: usize,
}

/// Buffer counters (for diagnostics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixBufferStats {
    pub pending: usize,
    pub evicted: u64,
    pub rejected: u64,
    pub out_of_order: u64,
}

struct FixQueue {
    ring: HeapRb<AbsoluteFix>,
    evicted: u64,
    rejected: u64,
    out_of_order: u64,
    last_timestamp: Option<f64>,
}

/// Thread-safe FIFO of pending absolute fixes
pub struct AbsoluteFixBuffer {
    queue: Mutex<FixQueue>,
    max_size: usize,
    overflow_policy: OverflowPolicy,
}

impl fmt::Debug for AbsoluteFixBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("AbsoluteFixBuffer")
            .field("len", &stats.pending)
            .field("max_size", &self.max_size)
            .field("overflow_policy", &self.overflow_policy)
            .field("evicted", &stats.evicted)
            .finish()
    }
}

impl Default for AbsoluteFixBuffer {
    fn default() -> Self {
        Self::new(&FixBufferConfig::default())
    }
}

impl AbsoluteFixBuffer {
    /// Create an empty buffer
    pub fn new(config: &FixBufferConfig) -> Self {
        let max_size = config.max_size.max(1);
        Self {
            queue: Mutex::new(FixQueue {
                ring: HeapRb::new(max_size),
                evicted: 0,
                rejected: 0,
                out_of_order: 0,
                last_timestamp: None,
            }),
            max_size,
            overflow_policy: config.overflow_policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FixQueue> {
        // A panic while holding the lock cannot leave the ring half-updated.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a fix at the tail.
    ///
    /// The stored accuracy is normalized. When the buffer is full the overflow policy
    /// decides between evicting the head and refusing the fix.
    ///
    /// # Errors
    /// - `InvalidTimestamp` for a non-finite timestamp
    /// - `BufferOverflow` when full under `RejectNewest`
    pub fn push(&self, fix: AbsoluteFix) -> Result<(), ContractError> {
        if !fix.timestamp.is_finite() {
            return Err(ContractError::invalid_timestamp(BUFFER_NAME, fix.timestamp));
        }
        let fix = fix.normalized();

        let mut queue = self.lock();

        if queue.ring.is_full() {
            match self.overflow_policy {
                OverflowPolicy::DropOldest => {
                    if let Some(evicted) = queue.ring.try_pop() {
                        queue.evicted += 1;
                        warn!(
                            evicted_timestamp = evicted.timestamp,
                            max = self.max_size,
                            "fix buffer full, evicted oldest fix"
                        );
                        metrics::counter!("fusion_sync_fixes_evicted_total").increment(1);
                    }
                }
                OverflowPolicy::RejectNewest => {
                    queue.rejected += 1;
                    metrics::counter!("fusion_sync_fixes_rejected_total").increment(1);
                    return Err(ContractError::BufferOverflow {
                        buffer: BUFFER_NAME.to_string(),
                        depth: queue.ring.occupied_len(),
                        max: self.max_size,
                    });
                }
            }
        }

        if let Some(last) = queue.last_timestamp {
            if fix.timestamp < last {
                queue.out_of_order += 1;
            }
        }
        queue.last_timestamp = Some(fix.timestamp);

        // Room was made above: a full ring either evicted its head or returned early.
        let pushed = queue.ring.try_push(fix).is_ok();
        debug_assert!(pushed, "fix buffer full after overflow handling");
        if !pushed {
            error!(timestamp = fix.timestamp, "fix buffer full after overflow handling");
        }
        let depth = queue.ring.occupied_len();
        drop(queue);

        trace!(timestamp = fix.timestamp, depth, "fix buffered");
        metrics::gauge!("fusion_sync_fix_buffer_depth").set(depth as f64);
        Ok(())
    }

    /// Copy of the head fix
    pub fn peek_front(&self) -> Option<AbsoluteFix> {
        self.lock().ring.iter().next().copied()
    }

    /// Remove and return the head fix
    pub fn pop_front(&self) -> Option<AbsoluteFix> {
        self.lock().ring.try_pop()
    }

    /// Scan from the head for a fix matching odometry time `t` within `tolerance`.
    ///
    /// Stale heads (`g < t - tolerance`) are popped and the scan continues; the first head
    /// inside `[t - tolerance, t + tolerance]` is popped as the match and the scan stops; a
    /// head beyond `t + tolerance` stays queued and the scan stops. The lock is held for the
    /// whole pass.
    pub fn reconcile(&self, t: f64, tolerance: f64) -> Reconciliation {
        let lower = t - tolerance;
        let upper = t + tolerance;
        let mut result = Reconciliation::default();

        let mut queue = self.lock();
        loop {
            let g = match queue.ring.iter().next() {
                Some(head) => head.timestamp,
                None => break,
            };

            if g < lower {
                queue.ring.try_pop();
                result.stale_dropped += 1;
                trace!(t, fix_timestamp = g, "stale fix dropped");
            } else if g <= upper {
                result.matched = queue.ring.try_pop();
                break;
            } else {
                result.deferred = true;
                break;
            }
        }
        result.pending = queue.ring.occupied_len();
        result
    }

    /// Number of pending fixes
    pub fn len(&self) -> usize {
        self.lock().ring.occupied_len()
    }

    /// Check if no fix is pending
    pub fn is_empty(&self) -> bool {
        self.lock().ring.is_empty()
    }

    /// Maximum number of pending fixes
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Configured overflow policy
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Snapshot of the buffer counters
    pub fn stats(&self) -> FixBufferStats {
        let queue = self.lock();
        FixBufferStats {
            pending: queue.ring.occupied_len(),
            evicted: queue.evicted,
            rejected: queue.rejected,
            out_of_order: queue.out_of_order,
        }
    }

    /// Timestamps of pending fixes, head first
    pub fn pending_timestamps(&self) -> Vec<f64> {
        self.lock().ring.iter().map(|fix| fix.timestamp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::GeoPoint;

    const TAU: f64 = 0.01;

    fn make_fix(timestamp: f64) -> AbsoluteFix {
        AbsoluteFix::new(
            timestamp,
            GeoPoint {
                latitude: 22.3,
                longitude: 114.2,
                altitude: 5.0,
            },
            2.0,
        )
    }

    fn buffer_with(timestamps: &[f64]) -> AbsoluteFixBuffer {
        let buffer = AbsoluteFixBuffer::default();
        for &t in timestamps {
            buffer.push(make_fix(t)).unwrap();
        }
        buffer
    }

    #[test]
    fn test_push_pop_fifo() {
        let buffer = buffer_with(&[3.0, 1.0, 2.0]);

        // Arrival order, not timestamp order
        assert_eq!(buffer.pop_front().unwrap().timestamp, 3.0);
        assert_eq!(buffer.pop_front().unwrap().timestamp, 1.0);
        assert_eq!(buffer.pop_front().unwrap().timestamp, 2.0);
        assert!(buffer.pop_front().is_none());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let buffer = buffer_with(&[1.0]);
        assert_eq!(buffer.peek_front().unwrap().timestamp, 1.0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_push_normalizes_accuracy() {
        let buffer = AbsoluteFixBuffer::default();
        let mut fix = make_fix(1.0);
        fix.accuracy = 0.0;
        buffer.push(fix).unwrap();
        assert_eq!(buffer.peek_front().unwrap().accuracy, 1.0);
    }

    #[test]
    fn test_push_rejects_nan_timestamp() {
        let buffer = AbsoluteFixBuffer::default();
        let result = buffer.push(make_fix(f64::NAN));
        assert!(matches!(
            result,
            Err(ContractError::InvalidTimestamp { .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drop_oldest_policy() {
        let buffer = AbsoluteFixBuffer::new(&FixBufferConfig {
            max_size: 3,
            overflow_policy: OverflowPolicy::DropOldest,
        });

        for t in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(make_fix(t)).unwrap();
        }

        assert_eq!(buffer.pending_timestamps(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.stats().evicted, 1);
    }

    #[test]
    fn test_drop_oldest_keeps_latest_under_sustained_overflow() {
        let buffer = AbsoluteFixBuffer::new(&FixBufferConfig {
            max_size: 1,
            overflow_policy: OverflowPolicy::DropOldest,
        });

        for k in 0..50 {
            buffer.push(make_fix(k as f64)).unwrap();
            assert_eq!(buffer.pending_timestamps(), vec![k as f64]);
        }
        assert_eq!(buffer.stats().evicted, 49);
    }

    #[test]
    fn test_reject_newest_policy() {
        let buffer = AbsoluteFixBuffer::new(&FixBufferConfig {
            max_size: 2,
            overflow_policy: OverflowPolicy::RejectNewest,
        });

        buffer.push(make_fix(1.0)).unwrap();
        buffer.push(make_fix(2.0)).unwrap();
        let err = buffer.push(make_fix(3.0)).unwrap_err();

        assert!(matches!(
            err,
            ContractError::BufferOverflow { depth: 2, max: 2, .. }
        ));
        assert_eq!(buffer.pending_timestamps(), vec![1.0, 2.0]);
        assert_eq!(buffer.stats().rejected, 1);
    }

    #[test]
    fn test_out_of_order_detection() {
        let buffer = buffer_with(&[1.0, 3.0, 2.0]);
        assert_eq!(buffer.stats().out_of_order, 1);
    }

    #[test]
    fn test_reconcile_empty() {
        let buffer = AbsoluteFixBuffer::default();
        let result = buffer.reconcile(10.0, TAU);
        assert_eq!(result, Reconciliation::default());
    }

    #[test]
    fn test_reconcile_drop_match_defer() {
        let buffer = buffer_with(&[9.5, 10.005, 10.5]);

        let result = buffer.reconcile(10.0, TAU);

        assert_eq!(result.matched.unwrap().timestamp, 10.005);
        assert_eq!(result.stale_dropped, 1);
        assert!(!result.deferred);
        assert_eq!(result.pending, 1);
        assert_eq!(buffer.pending_timestamps(), vec![10.5]);
    }

    #[test]
    fn test_reconcile_first_in_window_wins() {
        let buffer = buffer_with(&[9.995, 10.004]);

        let result = buffer.reconcile(10.0, TAU);

        // Oldest in-window fix, even though 10.004 is closer
        assert_eq!(result.matched.unwrap().timestamp, 9.995);
        assert_eq!(buffer.pending_timestamps(), vec![10.004]);
    }

    #[test]
    fn test_reconcile_defers_future() {
        let buffer = buffer_with(&[10.5, 9.0]);

        let result = buffer.reconcile(10.0, TAU);

        // Head is in the future: nothing behind it is inspected
        assert!(result.matched.is_none());
        assert!(result.deferred);
        assert_eq!(result.stale_dropped, 0);
        assert_eq!(buffer.pending_timestamps(), vec![10.5, 9.0]);
    }

    #[test]
    fn test_reconcile_window_bounds_inclusive() {
        let buffer = buffer_with(&[10.0 + TAU]);
        assert!(buffer.reconcile(10.0, TAU).matched.is_some());

        let buffer = buffer_with(&[10.0 - TAU]);
        assert!(buffer.reconcile(10.0, TAU).matched.is_some());
    }

    #[test]
    fn test_reconcile_drains_all_stale() {
        let buffer = buffer_with(&[1.0, 2.0, 3.0]);

        let result = buffer.reconcile(10.0, TAU);

        assert!(result.matched.is_none());
        assert_eq!(result.stale_dropped, 3);
        assert!(buffer.is_empty());
    }
}
