//! Synchronizer output and telemetry frames.

use serde::{Deserialize, Serialize};

use crate::{AbsoluteFix, FusedPose, StampedPose};

/// Result of processing one odometry sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Fused pose read back after the update
    pub fused: FusedPose,

    /// Fix attributed to this odometry tick, accuracy already normalized
    pub matched: Option<AbsoluteFix>,

    /// Stale fixes discarded while scanning
    pub stale_dropped: usize,

    /// Fixes left in the buffer after the scan
    pub pending_fixes: usize,
}

/// Per-frame synchronization summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub matched: bool,
    pub stale_dropped: usize,
    pub pending_fixes: usize,
}

impl From<&SyncOutcome> for SyncReport {
    fn from(outcome: &SyncOutcome) -> Self {
        Self {
            matched: outcome.matched.is_some(),
            stale_dropped: outcome.stale_dropped,
            pending_fixes: outcome.pending_fixes,
        }
    }
}

/// Input of the telemetry relay, in processing order.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// One processed odometry sample
    Fused(SyncOutcome),

    /// Latest ground-truth pose (optional third stream)
    GroundTruth(StampedPose),
}

/// Frame emitted downstream, one per processed odometry sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Sequence number (monotonically increasing from 1)
    pub sequence: u64,

    /// World frame the fused pose is expressed in
    pub world_frame_id: String,

    /// Fused pose
    pub fused: FusedPose,

    /// Fix matched on this tick, if any
    pub matched_fix: Option<AbsoluteFix>,

    /// Most recent ground-truth pose, if the stream is present
    pub ground_truth: Option<StampedPose>,

    /// Synchronization summary
    pub sync: SyncReport,
}
