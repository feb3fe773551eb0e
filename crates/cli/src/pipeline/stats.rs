//! Pipeline statistics.

use std::time::Duration;

use observability::SyncMetricsAggregator;
use sync_engine::{FixBufferStats, SynchronizerStats};
use telemetry::{ExportedFiles, MetricsSnapshot};

use super::StopReason;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Odometry samples run through the synchronizer
    pub samples_processed: u64,

    /// Fixes accepted into the buffer
    pub fixes_received: u64,

    /// Fixes refused by the buffer (reject-newest policy)
    pub fixes_rejected: u64,

    pub ground_truth_received: u64,

    /// Fusion anchor seeded from the first ground-truth pose
    pub anchor_seeded: bool,

    /// Telemetry frames emitted by the relay
    pub frames_emitted: u64,

    pub duration: Duration,

    pub active_sinks: usize,

    pub stop_reason: Option<StopReason>,

    pub buffer: FixBufferStats,

    pub synchronizer: SynchronizerStats,

    /// Per-sink delivery counters
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,

    pub sync_metrics: SyncMetricsAggregator,

    /// Files written at shutdown, if export is enabled
    pub export: Option<ExportedFiles>,
}

impl PipelineStats {
    /// Odometry samples per second of wall-clock time
    pub fn sample_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        if let Some(reason) = self.stop_reason {
            println!("   ├─ Stopped: {:?}", reason);
        }
        println!("   ├─ Odometry samples: {}", self.samples_processed);
        println!("   ├─ Rate: {:.2} Hz", self.sample_rate());
        println!(
            "   ├─ Fixes: {} accepted, {} rejected",
            self.fixes_received, self.fixes_rejected
        );
        println!(
            "   ├─ Ground truth: {} (anchor seeded: {})",
            self.ground_truth_received, self.anchor_seeded
        );
        println!("   └─ Frames emitted: {}", self.frames_emitted);

        println!("\n🧭 Fix Buffer");
        println!("   ├─ Pending at shutdown: {}", self.buffer.pending);
        println!("   ├─ Evicted (overflow): {}", self.buffer.evicted);
        println!("   ├─ Out-of-order arrivals: {}", self.buffer.out_of_order);
        println!(
            "   └─ Non-monotonic odometry: {}",
            self.synchronizer.non_monotonic
        );

        print!("\n📈 ");
        print!("{}", self.sync_metrics.summary());

        if !self.sink_metrics.is_empty() {
            println!("\n📤 Sinks ({})", self.active_sinks);
            for (i, (name, snapshot)) in self.sink_metrics.iter().enumerate() {
                let prefix = if i == self.sink_metrics.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!("   {} {}: {}", prefix, name, snapshot);
            }
        }

        if let Some(ref files) = self.export {
            println!("\n💾 Export");
            println!(
                "   ├─ {} ({} rows)",
                files.estimation.display(),
                files.estimation_rows
            );
            println!(
                "   └─ {} ({} rows)",
                files.validation.display(),
                files.validation_rows
            );
        }

        println!();
    }
}
