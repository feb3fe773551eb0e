//! Pass-through fusion engine.
//!
//! Stands in for a real global optimizer: the fused pose is the latest odometry pose mapped
//! into the world frame by an anchor transform. The anchor is fixed, or seeded once from the
//! first ground-truth pose. Absolute fixes are retained but do not correct the estimate.

use contracts::{FusedPose, FusionPort, GeoPoint, StampedPose};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Most recent fix registered with the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisteredFix {
    pub timestamp: f64,
    pub position: GeoPoint,
    pub accuracy: f64,
}

#[derive(Debug, Clone)]
pub struct PassthroughFusion {
    anchor: Isometry3<f64>,
    seeded: bool,
    pending_seed: Option<StampedPose>,
    latest: FusedPose,
    last_fix: Option<RegisteredFix>,
    fix_count: u64,
    path: Vec<StampedPose>,
}

impl Default for PassthroughFusion {
    fn default() -> Self {
        Self::new()
    }
}

impl PassthroughFusion {
    /// Engine whose world frame coincides with the odometry frame
    pub fn new() -> Self {
        Self::with_anchor(Isometry3::identity())
    }

    /// Engine mapping odometry poses through `anchor` (world <- odometry)
    pub fn with_anchor(anchor: Isometry3<f64>) -> Self {
        Self {
            anchor,
            seeded: false,
            pending_seed: None,
            latest: StampedPose::identity(0.0),
            last_fix: None,
            fix_count: 0,
            path: Vec::new(),
        }
    }

    pub fn anchor(&self) -> &Isometry3<f64> {
        &self.anchor
    }

    /// Whether the anchor has been seeded from ground truth
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Re-anchor the world frame so the odometry pose closest in time to `truth` lands on it
    ///
    /// Only the first call has an effect. Poses already on the fused path are re-expressed in
    /// the new frame. Before any odometry arrives the seed is held and applied on the first
    /// [`register_odometry`](FusionPort::register_odometry).
    pub fn seed_from_ground_truth(&mut self, truth: &StampedPose) {
        if self.seeded || self.pending_seed.is_some() {
            return;
        }
        let Some(reference) = self
            .path
            .iter()
            .min_by(|a, b| {
                (a.timestamp - truth.timestamp)
                    .abs()
                    .total_cmp(&(b.timestamp - truth.timestamp).abs())
            })
            .copied()
        else {
            self.pending_seed = Some(*truth);
            return;
        };

        let correction = isometry(truth) * isometry(&reference).inverse();
        self.anchor = correction * self.anchor;
        for pose in self.path.iter_mut() {
            *pose = reexpress(&correction, pose);
        }
        self.latest = reexpress(&correction, &self.latest);
        self.seeded = true;
    }

    /// Number of absolute fixes registered
    pub fn fix_count(&self) -> u64 {
        self.fix_count
    }

    /// Most recent absolute fix
    pub fn last_fix(&self) -> Option<RegisteredFix> {
        self.last_fix
    }
}

impl FusionPort for PassthroughFusion {
    fn register_odometry(
        &mut self,
        timestamp: f64,
        translation: &Vector3<f64>,
        orientation: &UnitQuaternion<f64>,
    ) {
        let local = Isometry3::from_parts(Translation3::from(*translation), *orientation);
        let world = self.anchor * local;
        self.latest = StampedPose::new(timestamp, world.translation.vector, world.rotation);
        self.path.push(self.latest);

        if let Some(truth) = self.pending_seed.take() {
            self.seed_from_ground_truth(&truth);
        }
    }

    fn register_absolute_fix(&mut self, timestamp: f64, position: &GeoPoint, accuracy: f64) {
        self.fix_count += 1;
        self.last_fix = Some(RegisteredFix {
            timestamp,
            position: *position,
            accuracy,
        });
    }

    fn current_fused_pose(&self) -> FusedPose {
        self.latest
    }

    fn fused_path(&self) -> Option<Vec<StampedPose>> {
        Some(self.path.clone())
    }
}

fn isometry(pose: &StampedPose) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(pose.translation), pose.orientation)
}

fn reexpress(correction: &Isometry3<f64>, pose: &StampedPose) -> StampedPose {
    let world = correction * isometry(pose);
    StampedPose::new(pose.timestamp, world.translation.vector, world.rotation)
}
