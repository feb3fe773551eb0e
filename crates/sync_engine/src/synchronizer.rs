//! Odometry-driven stream synchronizer.

use std::sync::Arc;

use contracts::{FusionPort, OdometrySample, SyncConfig, SyncOutcome};
use tracing::{debug, instrument, warn};

use crate::buffer::{AbsoluteFixBuffer, Reconciliation};

/// Synchronizer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynchronizerStats {
    /// Odometry samples processed
    pub processed: u64,
    /// Fixes matched and forwarded
    pub matched: u64,
    /// Fixes discarded as stale
    pub stale_dropped: u64,
    /// Samples whose timestamp went backwards
    pub non_monotonic: u64,
}

/// Pairs each odometry sample with at most one pending absolute fix and feeds the fusion engine.
///
/// The fix buffer is shared with the fix producer; the synchronizer itself lives on the
/// odometry path and is driven one sample at a time.
#[derive(Debug)]
pub struct StreamSynchronizer<F> {
    buffer: Arc<AbsoluteFixBuffer>,
    fusion: F,
    tolerance_s: f64,
    stats: SynchronizerStats,
    last_odometry_time: Option<f64>,
}

impl<F: FusionPort> StreamSynchronizer<F> {
    /// Create a synchronizer over an existing (shared) buffer
    pub fn new(config: &SyncConfig, buffer: Arc<AbsoluteFixBuffer>, fusion: F) -> Self {
        Self {
            buffer,
            fusion,
            tolerance_s: config.tolerance_s,
            stats: SynchronizerStats::default(),
            last_odometry_time: None,
        }
    }

    /// Create a synchronizer owning a fresh buffer built from `config`
    pub fn with_fresh_buffer(config: &SyncConfig, fusion: F) -> Self {
        let buffer = Arc::new(AbsoluteFixBuffer::new(&config.buffer));
        Self::new(config, buffer, fusion)
    }

    /// Process one odometry sample.
    ///
    /// The sample always reaches the fusion engine; a matched fix follows it as a separate
    /// absolute-position update, attributed to the odometry timestamp. No fusion call is made
    /// while the buffer lock is held.
    #[instrument(
        level = "trace",
        name = "synchronizer_process",
        skip(self, sample),
        fields(t = sample.timestamp)
    )]
    pub fn process(&mut self, sample: &OdometrySample) -> SyncOutcome {
        let t = sample.timestamp;
        self.track_odometry_time(t);

        self.fusion
            .register_odometry(t, &sample.translation, &sample.orientation);

        let reconciliation = self.buffer.reconcile(t, self.tolerance_s);

        if let Some(fix) = &reconciliation.matched {
            debug!(
                t,
                fix_timestamp = fix.timestamp,
                accuracy = fix.accuracy,
                "absolute fix matched"
            );
            self.fusion
                .register_absolute_fix(t, &fix.position, fix.accuracy);
        }

        let fused = self.fusion.current_fused_pose();
        self.record(&reconciliation);

        SyncOutcome {
            fused,
            matched: reconciliation.matched,
            stale_dropped: reconciliation.stale_dropped,
            pending_fixes: reconciliation.pending,
        }
    }

    fn track_odometry_time(&mut self, t: f64) {
        if let Some(last) = self.last_odometry_time {
            if t < last {
                self.stats.non_monotonic += 1;
                warn!(t, last, "odometry timestamp went backwards");
                metrics::counter!("fusion_sync_odometry_non_monotonic_total").increment(1);
            }
        }
        self.last_odometry_time = Some(t);
    }

    fn record(&mut self, reconciliation: &Reconciliation) {
        self.stats.processed += 1;
        self.stats.stale_dropped += reconciliation.stale_dropped as u64;

        metrics::counter!("fusion_sync_odometry_total").increment(1);
        metrics::gauge!("fusion_sync_fix_buffer_depth").set(reconciliation.pending as f64);

        if reconciliation.stale_dropped > 0 {
            metrics::counter!("fusion_sync_fixes_stale_total")
                .increment(reconciliation.stale_dropped as u64);
        }
        if reconciliation.matched.is_some() {
            self.stats.matched += 1;
            metrics::counter!("fusion_sync_fixes_matched_total").increment(1);
        } else if reconciliation.deferred {
            metrics::counter!("fusion_sync_fixes_deferred_total").increment(1);
        }
    }

    /// Shared fix buffer (clone the `Arc` to hand it to the fix producer)
    pub fn buffer(&self) -> &Arc<AbsoluteFixBuffer> {
        &self.buffer
    }

    /// Matching tolerance (seconds)
    pub fn tolerance(&self) -> f64 {
        self.tolerance_s
    }

    /// Timestamp of the most recent odometry sample
    pub fn last_odometry_time(&self) -> Option<f64> {
        self.last_odometry_time
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> SynchronizerStats {
        self.stats
    }

    /// Borrow the fusion engine
    pub fn fusion(&self) -> &F {
        &self.fusion
    }

    pub fn fusion_mut(&mut self) -> &mut F {
        &mut self.fusion
    }

    /// Consume the synchronizer and return the fusion engine
    pub fn into_fusion(self) -> F {
        self.fusion
    }
}
