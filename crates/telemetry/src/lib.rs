//! # Telemetry
//!
//! Downstream side of the fusion node.
//!
//! - Consumes `TelemetryEvent`s in processing order
//! - Numbers fused poses into `TelemetryFrame`s, attaching the latest ground truth
//! - Fans frames out to sinks, each behind its own queue. A lossy sink (the default) drops
//!   frames when its queue is full and never blocks the relay; a sink with `backpressure`
//!   set receives every frame and paces the relay instead
//! - Records the fused and ground-truth paths for the CSV export at shutdown

pub mod error;
pub mod export;
pub mod handle;
pub mod metrics;
pub mod relay;
pub mod sinks;

pub use contracts::{TelemetryFrame, TelemetrySink};
pub use error::TelemetryError;
pub use export::{export_stamp, export_trajectory, ExportedFiles, TrajectoryRecorder};
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use relay::{create_relay, RelayReport, TelemetryRelay};
pub use sinks::{FileSink, LogSink};

#[cfg(test)]
pub(crate) mod test_support {
    use contracts::{
        AbsoluteFix, GeoPoint, StampedPose, SyncOutcome, SyncReport, TelemetryFrame,
        UnitQuaternion, Vector3,
    };

    pub fn ground_truth(t: f64, x: f64) -> StampedPose {
        StampedPose::new(t, Vector3::new(x, 0.0, 0.0), UnitQuaternion::identity())
    }

    pub fn outcome(t: f64, matched: bool) -> SyncOutcome {
        SyncOutcome {
            fused: StampedPose::new(t, Vector3::new(t, 0.0, 0.0), UnitQuaternion::identity()),
            matched: matched.then(|| AbsoluteFix::new(t, GeoPoint::default(), 1.5)),
            stale_dropped: 0,
            pending_fixes: 0,
        }
    }

    pub fn frame(sequence: u64) -> TelemetryFrame {
        let outcome = outcome(sequence as f64 * 0.05, false);
        TelemetryFrame {
            sequence,
            world_frame_id: "world".to_string(),
            fused: outcome.fused,
            matched_fix: None,
            ground_truth: None,
            sync: SyncReport::from(&outcome),
        }
    }
}
