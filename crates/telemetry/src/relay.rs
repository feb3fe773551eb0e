//! TelemetryRelay - turns sync outcomes into numbered frames and fans them out to sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

use contracts::{
    SinkConfig, SinkType, StampedPose, SyncOutcome, SyncReport, TelemetryConfig, TelemetryEvent,
    TelemetryFrame,
};

use crate::error::TelemetryError;
use crate::export::TrajectoryRecorder;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// What the relay hands back once its input closes
#[derive(Debug, Default)]
pub struct RelayReport {
    /// Frames emitted (equals the last sequence number)
    pub frames: u64,
    /// Ground-truth poses received
    pub ground_truth: u64,
    /// Per-sink counters at shutdown
    pub sinks: Vec<(String, MetricsSnapshot)>,
    /// Paths for export
    pub recorder: TrajectoryRecorder,
}

/// Consumes [`TelemetryEvent`]s in order and emits one [`TelemetryFrame`] per fused pose
///
/// Every frame is offered to every sink. A sink without backpressure loses the frame when
/// its queue is full (counted in its `dropped_count`); a sink with backpressure sees every
/// frame, and the relay waits on it.
pub struct TelemetryRelay {
    world_frame_id: String,
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<TelemetryEvent>,
    sequence: u64,
    latest_ground_truth: Option<StampedPose>,
    ground_truth_count: u64,
    recorder: TrajectoryRecorder,
}

impl TelemetryRelay {
    /// Relay over already-spawned sink handles
    pub fn with_handles(
        world_frame_id: impl Into<String>,
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<TelemetryEvent>,
    ) -> Self {
        Self {
            world_frame_id: world_frame_id.into(),
            handles,
            input_rx,
            sequence: 0,
            latest_ground_truth: None,
            ground_truth_count: 0,
            recorder: TrajectoryRecorder::new(),
        }
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Build the frame for one outcome and advance the sequence
    pub fn frame_for(&mut self, outcome: &SyncOutcome) -> TelemetryFrame {
        self.sequence += 1;
        TelemetryFrame {
            sequence: self.sequence,
            world_frame_id: self.world_frame_id.clone(),
            fused: outcome.fused,
            matched_fix: outcome.matched,
            ground_truth: self.latest_ground_truth,
            sync: SyncReport::from(outcome),
        }
    }

    async fn handle_event(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::GroundTruth(pose) => {
                trace!(t = pose.timestamp, "Ground truth updated");
                self.ground_truth_count += 1;
                self.latest_ground_truth = Some(pose);
                self.recorder.record_ground_truth(pose);
            }
            TelemetryEvent::Fused(outcome) => {
                self.recorder.record_fused(outcome.fused);
                let frame = Arc::new(self.frame_for(&outcome));
                for handle in &self.handles {
                    handle.dispatch(Arc::clone(&frame)).await;
                }
                if self.sequence.is_multiple_of(100) {
                    debug!(frames = self.sequence, "Relay progress");
                }
            }
        }
    }

    /// Run until the input channel closes, then shut the sinks down
    #[instrument(name = "telemetry_relay_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> RelayReport {
        info!(world_frame_id = %self.world_frame_id, "Telemetry relay started");

        while let Some(event) = self.input_rx.recv().await {
            self.handle_event(event).await;
        }

        info!(frames = self.sequence, "Relay input closed, shutting down");

        let counters: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        for handle in self.handles {
            handle.shutdown().await;
        }
        let sinks = counters
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect();

        RelayReport {
            frames: self.sequence,
            ground_truth: self.ground_truth_count,
            sinks,
            recorder: self.recorder,
        }
    }

    pub fn spawn(self) -> JoinHandle<RelayReport> {
        tokio::spawn(self.run())
    }
}

/// Spawn a sink worker for one configured sink
#[instrument(
    name = "telemetry_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, TelemetryError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| TelemetryError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    Ok(handle.with_backpressure(config.backpressure))
}

/// Build a relay with one worker per configured sink
#[instrument(name = "telemetry_create_relay", skip_all, fields(sinks = sink_configs.len()))]
pub async fn create_relay(
    telemetry: &TelemetryConfig,
    sink_configs: &[SinkConfig],
    input_rx: mpsc::Receiver<TelemetryEvent>,
) -> Result<TelemetryRelay, TelemetryError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in sink_configs {
        match create_sink_handle(config).await {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in handles {
                    handle.shutdown().await;
                }
                return Err(e);
            }
        }
    }
    Ok(TelemetryRelay::with_handles(
        telemetry.world_frame_id.clone(),
        handles,
        input_rx,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ground_truth, outcome};
    use contracts::{ContractError, TelemetrySink};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CollectingSink {
        frames: Arc<Mutex<Vec<TelemetryFrame>>>,
    }

    impl TelemetrySink for CollectingSink {
        fn name(&self) -> &str {
            "collect"
        }

        async fn write(&mut self, frame: &TelemetryFrame) -> Result<(), ContractError> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_frames_numbered_in_processing_order() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let handle = SinkHandle::spawn(
            CollectingSink {
                frames: Arc::clone(&frames),
            },
            16,
        );
        let (tx, rx) = mpsc::channel(16);
        let relay = TelemetryRelay::with_handles("world", vec![handle], rx).spawn();

        for i in 0..4 {
            tx.send(TelemetryEvent::Fused(outcome(i as f64 * 0.05, i % 2 == 0)))
                .await
                .unwrap();
        }
        drop(tx);

        let report = relay.await.unwrap();
        assert_eq!(report.frames, 4);
        assert_eq!(report.sinks[0].1.write_count, 4);

        let frames = frames.lock().unwrap();
        let sequences: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert!(frames[0].sync.matched);
        assert!(!frames[1].sync.matched);
        assert!(frames.iter().all(|f| f.world_frame_id == "world"));
    }

    #[tokio::test]
    async fn test_latest_ground_truth_attached() {
        let (_tx, rx) = mpsc::channel(1);
        let mut relay = TelemetryRelay::with_handles("map", Vec::new(), rx);

        let first = relay.frame_for(&outcome(1.0, false));
        assert!(first.ground_truth.is_none());

        relay
            .handle_event(TelemetryEvent::GroundTruth(ground_truth(1.0, 3.0)))
            .await;
        relay
            .handle_event(TelemetryEvent::GroundTruth(ground_truth(1.05, 4.0)))
            .await;

        let second = relay.frame_for(&outcome(1.05, false));
        assert_eq!(second.sequence, 2);
        assert_eq!(second.world_frame_id, "map");
        let gt = second.ground_truth.unwrap();
        assert_eq!(gt.timestamp, 1.05);
        assert_eq!(gt.translation.x, 4.0);
    }

    #[tokio::test]
    async fn test_recorder_collects_paths() {
        let (tx, rx) = mpsc::channel(8);
        let relay = TelemetryRelay::with_handles("world", Vec::new(), rx).spawn();

        tx.send(TelemetryEvent::GroundTruth(ground_truth(0.0, 0.0)))
            .await
            .unwrap();
        tx.send(TelemetryEvent::Fused(outcome(0.0, true))).await.unwrap();
        tx.send(TelemetryEvent::Fused(outcome(0.05, false)))
            .await
            .unwrap();
        drop(tx);

        let report = relay.await.unwrap();
        assert_eq!(report.ground_truth, 1);
        assert_eq!(report.recorder.fused().len(), 2);
        assert_eq!(report.recorder.ground_truth().len(), 1);
    }

    #[tokio::test]
    async fn test_create_relay_from_config() {
        let (tx, rx) = mpsc::channel(10);
        let configs = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            backpressure: false,
            params: HashMap::new(),
        }];

        let relay = create_relay(&TelemetryConfig::default(), &configs, rx)
            .await
            .unwrap()
            .spawn();
        tx.send(TelemetryEvent::Fused(outcome(1.0, true))).await.unwrap();
        drop(tx);

        let report = relay.await.unwrap();
        assert_eq!(report.sinks.len(), 1);
        assert_eq!(report.sinks[0].0, "test_log");
        assert_eq!(report.sinks[0].1.write_count, 1);
    }

    #[tokio::test]
    async fn test_create_relay_rejects_unwritable_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let (_tx, rx) = mpsc::channel(1);
        let configs = vec![SinkConfig {
            name: "frames".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 10,
            backpressure: false,
            params: HashMap::from([(
                "path".to_string(),
                blocker.join("frames.jsonl").display().to_string(),
            )]),
        }];

        let err = create_relay(&TelemetryConfig::default(), &configs, rx)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TelemetryError::SinkCreation { .. }));
    }

    #[tokio::test]
    async fn test_backpressure_sink_sees_every_frame() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let handle = SinkHandle::spawn(
            CollectingSink {
                frames: Arc::clone(&frames),
            },
            1,
        )
        .with_backpressure(true);
        let (tx, rx) = mpsc::channel(256);
        let relay = TelemetryRelay::with_handles("world", vec![handle], rx).spawn();

        for i in 0..200 {
            tx.send(TelemetryEvent::Fused(outcome(i as f64 * 0.05, false)))
                .await
                .unwrap();
        }
        drop(tx);

        let report = relay.await.unwrap();
        assert_eq!(report.frames, 200);
        assert_eq!(report.sinks[0].1.write_count, 200);
        assert_eq!(report.sinks[0].1.dropped_count, 0);
        assert_eq!(frames.lock().unwrap().len(), 200);
    }
}
