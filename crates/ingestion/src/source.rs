//! Simulated producer streams
//!
//! One tokio task per stream. Sample times are exact multiples of the stream period on a
//! simulation clock starting at 0, so odometry and ground-truth stamps line up.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use contracts::{AbsoluteFix, OdometrySample, SourceConfig, StampedPose};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::trajectory::SimulatedTrajectory;

/// Receivers for the streams of one simulated run
#[derive(Debug)]
pub struct SimulatedStreams {
    pub odometry: mpsc::Receiver<OdometrySample>,
    pub fixes: mpsc::Receiver<AbsoluteFix>,
    /// Present when `SourceConfig::ground_truth` is set
    pub ground_truth: Option<mpsc::Receiver<StampedPose>>,
}

/// Simulated odometry / fix / ground-truth producer
pub struct SimulatedSource {
    config: SourceConfig,
    trajectory: SimulatedTrajectory,
    running: Arc<AtomicBool>,
}

impl SimulatedSource {
    pub fn new(config: SourceConfig) -> Self {
        Self::with_trajectory(config, SimulatedTrajectory::default())
    }

    pub fn with_trajectory(config: SourceConfig, trajectory: SimulatedTrajectory) -> Self {
        Self {
            config,
            trajectory,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn trajectory(&self) -> &SimulatedTrajectory {
        &self.trajectory
    }

    /// Number of ticks a stream at `hz` emits over the configured duration
    pub fn sample_count(&self, hz: f64) -> u64 {
        (self.config.duration_s * hz).floor() as u64 + 1
    }

    /// Spawn the producer tasks
    ///
    /// Each stream ends after `duration_s`, on [`stop`](Self::stop), or when its receiver is
    /// dropped.
    pub fn start(&self, channel_capacity: usize) -> Result<SimulatedStreams> {
        let odom_period = period("odometry", self.config.odometry_hz)?;
        let fix_period = period("fix", self.config.fix_hz)?;
        let fix_latency = to_duration("fix", "latency", self.config.fix_latency_s)?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IngestionError::AlreadyRunning);
        }

        let capacity = channel_capacity.max(1);
        let config = &self.config;

        let (odom_tx, odometry) = mpsc::channel(capacity);
        let traj = self.trajectory.clone();
        self.spawn_stream(
            "odometry",
            config.odometry_hz,
            odom_period,
            Duration::ZERO,
            odom_tx,
            move |t| traj.odometry(t),
        );

        let (fix_tx, fixes) = mpsc::channel(capacity);
        let traj = self.trajectory.clone();
        let accuracy = config.fix_accuracy;
        self.spawn_stream(
            "fix",
            config.fix_hz,
            fix_period,
            fix_latency,
            fix_tx,
            move |t| traj.fix(t, accuracy),
        );

        let ground_truth = config.ground_truth.then(|| {
            let (gt_tx, gt_rx) = mpsc::channel(capacity);
            let traj = self.trajectory.clone();
            self.spawn_stream(
                "ground_truth",
                config.odometry_hz,
                odom_period,
                Duration::ZERO,
                gt_tx,
                move |t| traj.ground_truth(t),
            );
            gt_rx
        });

        debug!(
            odometry_hz = config.odometry_hz,
            fix_hz = config.fix_hz,
            duration_s = config.duration_s,
            realtime = config.realtime,
            "simulated source started"
        );

        Ok(SimulatedStreams {
            odometry,
            fixes,
            ground_truth,
        })
    }

    fn spawn_stream<T, F>(
        &self,
        stream: &'static str,
        hz: f64,
        period: Duration,
        latency: Duration,
        tx: mpsc::Sender<T>,
        sample_at: F,
    ) where
        T: Send + 'static,
        F: Fn(f64) -> T + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        let count = self.sample_count(hz);
        let realtime = self.config.realtime;

        tokio::spawn(async move {
            if !latency.is_zero() {
                pace(realtime, tokio::time::sleep(latency)).await;
            }

            for k in 0..count {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let t = k as f64 / hz;
                if tx.send(sample_at(t)).await.is_err() {
                    debug!(stream, "receiver dropped");
                    break;
                }
                counter!("fusion_sync_samples_produced_total", "stream" => stream).increment(1);
                trace!(stream, t, "sample sent");

                pace(realtime, tokio::time::sleep(period)).await;
            }

            debug!(stream, "simulated stream finished");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Sample period for a stream at `hz`
fn period(stream: &'static str, hz: f64) -> Result<Duration> {
    if !(hz.is_finite() && hz > 0.0) {
        return Err(IngestionError::InvalidRate { stream, hz });
    }
    to_duration(stream, "period", hz.recip())
}

fn to_duration(stream: &'static str, what: &'static str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| IngestionError::DurationOutOfRange {
        stream,
        what,
        seconds,
    })
}

/// Await `delay` in realtime mode, otherwise just yield
async fn pace(realtime: bool, delay: impl Future<Output = ()>) {
    if realtime {
        delay.await;
    } else {
        tokio::task::yield_now().await;
    }
}
