//! Sync metrics
//!
//! Prometheus recording per processed odometry sample plus an in-memory aggregator for the
//! end-of-run summary.

use contracts::SyncOutcome;
use metrics::{counter, gauge, histogram};

/// Record metrics for one processed odometry sample
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_outcome;
///
/// let outcome = synchronizer.process(&sample);
/// record_sync_outcome(&outcome);
/// ```
pub fn record_sync_outcome(outcome: &SyncOutcome) {
    counter!("fusion_sync_samples_total").increment(1);
    gauge!("fusion_sync_last_fused_timestamp").set(outcome.fused.timestamp);
    histogram!("fusion_sync_pending_fixes").record(outcome.pending_fixes as f64);

    if let Some(fix) = &outcome.matched {
        counter!("fusion_sync_samples_with_fix_total").increment(1);
        histogram!("fusion_sync_match_offset_ms")
            .record((fix.timestamp - outcome.fused.timestamp).abs() * 1000.0);
        histogram!("fusion_sync_fix_accuracy").record(fix.accuracy);
    }

    if outcome.stale_dropped > 0 {
        histogram!("fusion_sync_stale_per_sample").record(outcome.stale_dropped as f64);
    }
}

/// Record an absolute fix arriving on the producer path
pub fn record_fix_received(accepted: bool) {
    let status = if accepted { "accepted" } else { "rejected" };
    counter!("fusion_sync_fixes_received_total", "status" => status).increment(1);
}

/// Record a ground-truth pose arriving
pub fn record_ground_truth_received() {
    counter!("fusion_sync_ground_truth_total").increment(1);
}

/// Record a telemetry frame dispatched to a sink
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fusion_sync_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Sync metrics aggregator
///
/// Aggregates per-sample outcomes in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// Odometry samples processed
    pub total_samples: u64,

    /// Samples paired with a fix
    pub matched_samples: u64,

    /// Fixes discarded as stale
    pub total_stale: u64,

    /// |fix time - odometry time| of matches (ms)
    pub match_offset_stats: RunningStats,

    /// Pending fixes after each scan
    pub pending_stats: RunningStats,

    /// Accuracy of matched fixes
    pub accuracy_stats: RunningStats,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the aggregate
    pub fn update(&mut self, outcome: &SyncOutcome) {
        self.total_samples += 1;
        self.total_stale += outcome.stale_dropped as u64;
        self.pending_stats.push(outcome.pending_fixes as f64);

        if let Some(fix) = &outcome.matched {
            self.matched_samples += 1;
            self.match_offset_stats
                .push((fix.timestamp - outcome.fused.timestamp).abs() * 1000.0);
            self.accuracy_stats.push(fix.accuracy);
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_samples: self.total_samples,
            matched_samples: self.matched_samples,
            total_stale: self.total_stale,
            match_rate: if self.total_samples > 0 {
                self.matched_samples as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            match_offset_ms: StatsSummary::from(&self.match_offset_stats),
            pending_fixes: StatsSummary::from(&self.pending_stats),
            fix_accuracy: StatsSummary::from(&self.accuracy_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub matched_samples: u64,
    pub total_stale: u64,
    pub match_rate: f64,
    pub match_offset_ms: StatsSummary,
    pub pending_fixes: StatsSummary,
    pub fix_accuracy: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Odometry samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Samples with fix: {} ({:.2}%)",
            self.matched_samples, self.match_rate
        )?;
        writeln!(f, "Stale fixes dropped: {}", self.total_stale)?;
        writeln!(f, "Match offset (ms): {}", self.match_offset_ms)?;
        writeln!(f, "Pending fixes: {}", self.pending_fixes)?;
        writeln!(f, "Fix accuracy: {}", self.fix_accuracy)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
