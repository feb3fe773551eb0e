//! Pipeline orchestrator - wires producers, synchronizer, relay and export.
//!
//! ```text
//! fix stream ──push──▶ Arc<AbsoluteFixBuffer> ◀──reconcile── odometry loop ──▶ relay ──▶ sinks
//! ground truth ──first pose──▶ fusion anchor
//!              ─────────────────────────────────────────────────────────────▶ relay
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{AbsoluteFix, FusionBlueprint, FusionPort, StampedPose, TelemetryEvent};
use ingestion::SimulatedSource;
use observability::{record_fix_received, record_ground_truth_received, record_sync_outcome};
use sync_engine::{AbsoluteFixBuffer, PassthroughFusion, StreamSynchronizer};
use telemetry::{RelayReport, export_stamp};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Upper bound on waiting for background tasks at shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: FusionBlueprint,

    /// Stop after this many odometry samples (None = until the stream ends)
    pub max_samples: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl PipelineConfig {
    pub fn new(blueprint: FusionBlueprint) -> Self {
        Self {
            blueprint,
            max_samples: None,
            timeout: None,
            metrics_port: None,
        }
    }
}

/// Why the odometry loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StreamEnded,
    MaxSamples,
    Timeout,
    Shutdown,
    RelayClosed,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the odometry stream ends, a limit is hit, or `shutdown` resolves
    ///
    /// Shutdown order: producers stop, the fix consumer and ground-truth forwarder drain, the
    /// relay flushes its sinks, then the trajectory is exported.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let capacity = blueprint.telemetry.channel_capacity;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        let source = SimulatedSource::new(blueprint.source.clone());
        let streams = source
            .start(capacity)
            .context("Failed to start simulated source")?;
        info!(
            odometry_hz = blueprint.source.odometry_hz,
            fix_hz = blueprint.source.fix_hz,
            ground_truth = streams.ground_truth.is_some(),
            "Producer streams started"
        );

        let buffer = Arc::new(AbsoluteFixBuffer::new(&blueprint.sync.buffer));

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - fused poses are only exported");
        }
        let (event_tx, event_rx) = mpsc::channel::<TelemetryEvent>(capacity);
        let relay = telemetry::create_relay(&blueprint.telemetry, &blueprint.sinks, event_rx)
            .await
            .context("Failed to create telemetry relay")?;
        let relay_handle = relay.spawn();
        info!(sinks = blueprint.sinks.len(), "Telemetry relay started");

        let fix_handle = spawn_fix_consumer(streams.fixes, Arc::clone(&buffer));
        let (seed_tx, seed_rx) = oneshot::channel();
        let mut seed_rx = Some(seed_rx);
        let truth_handle = streams
            .ground_truth
            .map(|rx| spawn_ground_truth_forwarder(rx, event_tx.clone(), seed_tx));

        let mut stats = PipelineStats {
            active_sinks: blueprint.sinks.len(),
            ..Default::default()
        };
        let mut synchronizer =
            StreamSynchronizer::new(&blueprint.sync, Arc::clone(&buffer), PassthroughFusion::new());
        let mut odometry = streams.odometry;

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        info!(max_samples = ?self.config.max_samples, "Pipeline running");

        let stop_reason = loop {
            let sample = tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Shutdown,
                _ = &mut deadline => break StopReason::Timeout,
                sample = odometry.recv() => match sample {
                    Some(sample) => sample,
                    None => break StopReason::StreamEnded,
                },
            };

            if let Some(rx) = seed_rx.as_mut() {
                match rx.try_recv() {
                    Ok(truth) => {
                        synchronizer.fusion_mut().seed_from_ground_truth(&truth);
                        debug!(t = truth.timestamp, "Fusion anchor seeded from ground truth");
                        seed_rx = None;
                    }
                    Err(oneshot::error::TryRecvError::Closed) => seed_rx = None,
                    Err(oneshot::error::TryRecvError::Empty) => {}
                }
            }

            let outcome = synchronizer.process(&sample);
            record_sync_outcome(&outcome);
            stats.sync_metrics.update(&outcome);
            stats.samples_processed += 1;

            if event_tx.send(TelemetryEvent::Fused(outcome)).await.is_err() {
                break StopReason::RelayClosed;
            }

            if self
                .config
                .max_samples
                .is_some_and(|max| stats.samples_processed >= max)
            {
                break StopReason::MaxSamples;
            }
        };

        match stop_reason {
            StopReason::Timeout => warn!("Pipeline timed out"),
            StopReason::RelayClosed => warn!("Relay channel closed"),
            reason => info!(?reason, samples = stats.samples_processed, "Odometry loop ended"),
        }
        stats.stop_reason = Some(stop_reason);

        info!("Shutting down pipeline...");
        // A naturally ended run lets the other streams finish their last samples.
        if stop_reason != StopReason::StreamEnded {
            source.stop();
        }
        drop(odometry);

        let (accepted, rejected) = join_within(fix_handle, "fix consumer").await?;
        stats.fixes_received = accepted;
        stats.fixes_rejected = rejected;

        if let Some(handle) = truth_handle {
            stats.ground_truth_received = join_within(handle, "ground-truth forwarder").await?;
        }
        // Seed that arrived after the last odometry sample; the fused path is re-expressed.
        if let Some(Ok(truth)) = seed_rx.map(|mut rx| rx.try_recv()) {
            synchronizer.fusion_mut().seed_from_ground_truth(&truth);
        }
        stats.anchor_seeded = synchronizer.fusion().is_seeded();

        drop(event_tx);
        let report: RelayReport = join_within(relay_handle, "telemetry relay").await?;

        stats.frames_emitted = report.frames;
        stats.sink_metrics = report.sinks;
        stats.buffer = buffer.stats();
        stats.synchronizer = synchronizer.stats();

        let mut recorder = report.recorder;
        if let Some(path) = synchronizer.fusion().fused_path() {
            recorder.set_fused(path);
        }
        if let Some(dir) = &blueprint.export.saving_path {
            let files = recorder
                .export(dir, export_stamp())
                .with_context(|| format!("Failed to export trajectory to {}", dir.display()))?;
            stats.export = Some(files);
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate_hz = format!("{:.2}", stats.sample_rate()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Fix producer path: push every fix into the shared buffer
///
/// Returns (accepted, rejected).
fn spawn_fix_consumer(
    mut fixes: mpsc::Receiver<AbsoluteFix>,
    buffer: Arc<AbsoluteFixBuffer>,
) -> JoinHandle<(u64, u64)> {
    tokio::spawn(async move {
        let (mut accepted, mut rejected) = (0u64, 0u64);
        while let Some(fix) = fixes.recv().await {
            match buffer.push(fix) {
                Ok(()) => {
                    accepted += 1;
                    record_fix_received(true);
                }
                Err(e) => {
                    rejected += 1;
                    record_fix_received(false);
                    warn!(t = fix.timestamp, error = %e, "Fix rejected");
                }
            }
        }
        debug!(accepted, rejected, "Fix consumer finished");
        (accepted, rejected)
    })
}

/// Forward ground truth to the relay; the first pose also seeds the fusion anchor
fn spawn_ground_truth_forwarder(
    mut truth: mpsc::Receiver<StampedPose>,
    events: mpsc::Sender<TelemetryEvent>,
    seed: oneshot::Sender<StampedPose>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seed = Some(seed);
        let mut forwarded = 0u64;
        while let Some(pose) = truth.recv().await {
            record_ground_truth_received();
            if let Some(tx) = seed.take() {
                if tx.send(pose).is_err() {
                    debug!("Odometry loop gone, anchor seed unused");
                }
            }
            if events.send(TelemetryEvent::GroundTruth(pose)).await.is_err() {
                break;
            }
            forwarded += 1;
        }
        forwarded
    })
}

async fn join_within<T>(handle: JoinHandle<T>, task: &str) -> Result<T, CliError> {
    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CliError::pipeline_execution(format!(
            "{} task failed: {}",
            task, e
        ))),
        Err(_) => Err(CliError::pipeline_execution(format!(
            "{} did not finish within {:?}",
            task, DRAIN_TIMEOUT
        ))),
    }
}
