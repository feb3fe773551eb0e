//! FusionPort trait - boundary to the external fusion engine.

use nalgebra::{UnitQuaternion, Vector3};

use crate::{FusedPose, GeoPoint, StampedPose};

/// Narrow contract the synchronizer requires from a pose fusion engine.
///
/// Implementations are opaque, always-available collaborators. Calls are made synchronously
/// on the odometry path and never while the fix buffer lock is held. The only consistency
/// requirement is read-after-write on the calling thread: `current_fused_pose` must reflect
/// the preceding `register_odometry`.
pub trait FusionPort {
    /// Record a local-motion observation at time `timestamp`.
    fn register_odometry(
        &mut self,
        timestamp: f64,
        translation: &Vector3<f64>,
        orientation: &UnitQuaternion<f64>,
    );

    /// Record an absolute-position observation weighted by `accuracy` (always > 0).
    fn register_absolute_fix(&mut self, timestamp: f64, position: &GeoPoint, accuracy: f64);

    /// Latest fused estimate.
    fn current_fused_pose(&self) -> FusedPose;

    /// Full fused trajectory, if the engine keeps one (used for export at shutdown).
    fn fused_path(&self) -> Option<Vec<StampedPose>> {
        None
    }
}

impl<F: FusionPort + ?Sized> FusionPort for Box<F> {
    fn register_odometry(
        &mut self,
        timestamp: f64,
        translation: &Vector3<f64>,
        orientation: &UnitQuaternion<f64>,
    ) {
        (**self).register_odometry(timestamp, translation, orientation)
    }

    fn register_absolute_fix(&mut self, timestamp: f64, position: &GeoPoint, accuracy: f64) {
        (**self).register_absolute_fix(timestamp, position, accuracy)
    }

    fn current_fused_pose(&self) -> FusedPose {
        (**self).current_fused_pose()
    }

    fn fused_path(&self) -> Option<Vec<StampedPose>> {
        (**self).fused_path()
    }
}
