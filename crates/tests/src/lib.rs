//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! - Configuration to relay wiring
//! - Simulated streams through the synchronizer, relay and export
//! - Fix buffer behaviour under concurrent producers

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, OverflowPolicy, SinkType};

    #[test]
    fn test_full_config_round_trip_through_loader() {
        let toml = r#"
            [sync]
            tolerance_s = 0.02
            [sync.buffer]
            max_size = 8
            overflow_policy = "reject_newest"

            [telemetry]
            world_frame_id = "map"

            [export]
            saving_path = "/tmp/fusion"

            [source]
            odometry_hz = 10.0
            fix_hz = 1.0

            [[sinks]]
            name = "frames"
            sink_type = "file"
            queue_capacity = 4
            backpressure = true
            [sinks.params]
            path = "/tmp/fusion/frames.jsonl"
        "#;

        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.sync.buffer.overflow_policy, OverflowPolicy::RejectNewest);
        assert_eq!(blueprint.telemetry.world_frame_id, "map");
        assert_eq!(blueprint.sinks[0].sink_type, SinkType::File);
        assert!(blueprint.sinks[0].backpressure);

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded, blueprint);
    }

    #[test]
    fn test_out_of_range_latency_rejected() {
        let toml = r#"
            [source]
            fix_latency_s = 1e20
        "#;

        let err = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_unknown_sink_type_rejected() {
        let toml = r#"
            [[sinks]]
            name = "udp"
            sink_type = "network"
        "#;

        assert!(ConfigLoader::load_from_str(toml, ConfigFormat::Toml).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        AbsoluteFix, FixBufferConfig, FusionBlueprint, GeoPoint, OdometrySample, OverflowPolicy,
        SinkConfig, SinkType, SyncConfig, TelemetryConfig, TelemetryEvent, TelemetryFrame,
        UnitQuaternion, Vector3,
    };
    use ingestion::SimulatedSource;
    use observability::SyncMetricsAggregator;
    use sync_engine::{AbsoluteFixBuffer, FusionPort, PassthroughFusion, StreamSynchronizer};
    use telemetry::create_relay;
    use tokio::sync::mpsc;

    fn odometry(t: f64) -> OdometrySample {
        OdometrySample::new(t, Vector3::new(t, 0.0, 0.0), UnitQuaternion::identity())
    }

    fn fix(t: f64) -> AbsoluteFix {
        AbsoluteFix::new(t, GeoPoint::default(), 2.0)
    }

    /// End-to-end: SimulatedSource -> buffer + StreamSynchronizer -> TelemetryRelay -> file sink
    /// -> CSV export
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_simulated_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let frames_path = dir.path().join("frames.jsonl");

        let mut blueprint = FusionBlueprint::default();
        blueprint.source.duration_s = 2.0;
        blueprint.source.realtime = false;

        let source = SimulatedSource::new(blueprint.source.clone());
        let streams = source.start(64).unwrap();

        let buffer = Arc::new(AbsoluteFixBuffer::new(&blueprint.sync.buffer));
        let fix_buffer = Arc::clone(&buffer);
        let mut fixes = streams.fixes;
        let fix_task = tokio::spawn(async move {
            let mut pushed = 0;
            while let Some(fix) = fixes.recv().await {
                fix_buffer.push(fix).unwrap();
                pushed += 1;
            }
            pushed
        });

        let (event_tx, event_rx) = mpsc::channel(64);
        let sinks = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                backpressure: false,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 100,
                backpressure: true,
                params: HashMap::from([(
                    "path".to_string(),
                    frames_path.display().to_string(),
                )]),
            },
        ];
        let relay = create_relay(&blueprint.telemetry, &sinks, event_rx)
            .await
            .unwrap()
            .spawn();

        let mut truth = streams.ground_truth.unwrap();
        let truth_tx = event_tx.clone();
        let truth_task = tokio::spawn(async move {
            while let Some(pose) = truth.recv().await {
                if truth_tx.send(TelemetryEvent::GroundTruth(pose)).await.is_err() {
                    break;
                }
            }
        });

        let mut synchronizer =
            StreamSynchronizer::new(&blueprint.sync, Arc::clone(&buffer), PassthroughFusion::new());
        let mut aggregator = SyncMetricsAggregator::new();
        let mut odometry_rx = streams.odometry;

        let run = async {
            while let Some(sample) = odometry_rx.recv().await {
                let outcome = synchronizer.process(&sample);
                aggregator.update(&outcome);
                event_tx.send(TelemetryEvent::Fused(outcome)).await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("pipeline timed out");

        assert_eq!(fix_task.await.unwrap(), 11);
        truth_task.await.unwrap();
        drop(event_tx);
        let report = relay.await.unwrap();

        assert_eq!(report.frames, 41);
        assert_eq!(aggregator.total_samples, 41);
        for (_, snapshot) in &report.sinks {
            assert_eq!(snapshot.write_count, 41);
        }

        // Frames on disk: numbered from 1, each match inside the window, no fix used twice.
        let content = std::fs::read_to_string(&frames_path).unwrap();
        let frames: Vec<TelemetryFrame> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(frames.len(), 41);

        let mut used = HashSet::new();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.sequence, i as u64 + 1);
            assert_eq!(frame.world_frame_id, "world");
            if let Some(matched) = frame.matched_fix {
                assert!((matched.timestamp - frame.fused.timestamp).abs() <= 0.01 + 1e-12);
                assert!(used.insert(matched.timestamp.to_bits()));
            }
        }
        assert_eq!(used.len() as u64, synchronizer.stats().matched);
        assert_eq!(
            synchronizer.fusion().fix_count(),
            synchronizer.stats().matched
        );

        let mut recorder = report.recorder;
        recorder.set_fused(synchronizer.fusion().fused_path().unwrap());
        let files = recorder.export(dir.path(), 1).unwrap();
        assert_eq!(files.estimation_rows, 41);
        assert_eq!(files.validation_rows, 41);
    }

    /// Worked example: t = 10.0, tolerance 0.01, queue [9.5, 10.005, 10.5]
    #[test]
    fn test_stale_match_defer_example() {
        let config = SyncConfig::default();
        let mut synchronizer = StreamSynchronizer::with_fresh_buffer(&config, PassthroughFusion::new());
        for t in [9.5, 10.005, 10.5] {
            synchronizer.buffer().push(fix(t)).unwrap();
        }

        let outcome = synchronizer.process(&odometry(10.0));
        assert_eq!(outcome.matched.unwrap().timestamp, 10.005);
        assert_eq!(outcome.stale_dropped, 1);
        assert_eq!(synchronizer.buffer().pending_timestamps(), vec![10.5]);

        let registered = synchronizer.fusion().last_fix().unwrap();
        assert_eq!(registered.timestamp, 10.0);
    }

    /// Two fixes inside one window: the earliest wins, the other waits for the next tick
    #[test]
    fn test_first_in_window_wins() {
        let config = SyncConfig::default();
        let mut synchronizer = StreamSynchronizer::with_fresh_buffer(&config, PassthroughFusion::new());
        synchronizer.buffer().push(fix(9.995)).unwrap();
        synchronizer.buffer().push(fix(10.004)).unwrap();

        let outcome = synchronizer.process(&odometry(10.0));
        assert_eq!(outcome.matched.unwrap().timestamp, 9.995);
        assert_eq!(synchronizer.buffer().pending_timestamps(), vec![10.004]);

        let next = synchronizer.process(&odometry(10.05));
        assert!(next.matched.is_none());
        assert_eq!(next.stale_dropped, 1);
    }

    #[test]
    fn test_zero_accuracy_reaches_fusion_as_one() {
        let config = SyncConfig::default();
        let mut synchronizer = StreamSynchronizer::with_fresh_buffer(&config, PassthroughFusion::new());
        synchronizer
            .buffer()
            .push(AbsoluteFix {
                timestamp: 5.0,
                position: GeoPoint::default(),
                accuracy: 0.0,
            })
            .unwrap();

        let outcome = synchronizer.process(&odometry(5.0));
        assert_eq!(outcome.matched.unwrap().accuracy, 1.0);
        assert_eq!(synchronizer.fusion().last_fix().unwrap().accuracy, 1.0);
    }

    #[test]
    fn test_reject_newest_surfaces_overflow() {
        let buffer = AbsoluteFixBuffer::new(&FixBufferConfig {
            max_size: 2,
            overflow_policy: OverflowPolicy::RejectNewest,
        });
        buffer.push(fix(1.0)).unwrap();
        buffer.push(fix(2.0)).unwrap();
        assert!(buffer.push(fix(3.0)).is_err());
        assert_eq!(buffer.pending_timestamps(), vec![1.0, 2.0]);
    }

    /// Concurrent fix producer never causes a fix to be matched twice or lost unaccounted
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_push_and_process() {
        let config = SyncConfig::default();
        let buffer = Arc::new(AbsoluteFixBuffer::new(&config.buffer));

        let producer_buffer = Arc::clone(&buffer);
        let producer = tokio::spawn(async move {
            for k in 0..200 {
                producer_buffer.push(fix(k as f64 * 0.2)).unwrap();
                tokio::task::yield_now().await;
            }
        });

        let mut synchronizer =
            StreamSynchronizer::new(&config, Arc::clone(&buffer), PassthroughFusion::new());
        let mut matched = HashSet::new();
        let mut stale = 0;
        for k in 0..800 {
            let outcome = synchronizer.process(&odometry(k as f64 * 0.05));
            stale += outcome.stale_dropped;
            if let Some(fix) = outcome.matched {
                assert!(matched.insert(fix.timestamp.to_bits()));
            }
            if k % 8 == 0 {
                tokio::task::yield_now().await;
            }
        }
        producer.await.unwrap();

        let accounted = matched.len() + stale + buffer.len() + buffer.stats().evicted as usize;
        assert_eq!(accounted, 200);
    }

    #[tokio::test]
    async fn test_relay_echoes_latest_ground_truth() {
        let (tx, rx) = mpsc::channel(8);
        let relay = create_relay(&TelemetryConfig::default(), &[], rx)
            .await
            .unwrap();
        let handle = relay.spawn();

        let mut synchronizer =
            StreamSynchronizer::with_fresh_buffer(&SyncConfig::default(), PassthroughFusion::new());
        let truth = contracts::StampedPose::identity(0.0);
        tx.send(TelemetryEvent::GroundTruth(truth)).await.unwrap();
        tx.send(TelemetryEvent::Fused(synchronizer.process(&odometry(0.0))))
            .await
            .unwrap();
        drop(tx);

        let report = handle.await.unwrap();
        assert_eq!(report.frames, 1);
        assert_eq!(report.ground_truth, 1);
        assert_eq!(report.recorder.ground_truth()[0].timestamp, 0.0);
    }
}
