//! Circular reference trajectory and the three sensor views of it

use std::f64::consts::FRAC_PI_2;

use contracts::{AbsoluteFix, GeoPoint, OdometrySample, StampedPose};
use nalgebra::{UnitQuaternion, Vector3};

/// Mean earth radius (m) for the flat-earth projection
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Vehicle driving a horizontal circle around a geodetic origin
///
/// The local frame is east-north-up with its origin at `origin`. Odometry accumulates a
/// constant drift so the fused output has something to correct.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrajectory {
    /// Circle radius (m)
    pub radius_m: f64,
    /// Yaw rate (rad/s)
    pub angular_rate: f64,
    /// Geodetic anchor of the local frame
    pub origin: GeoPoint,
    /// Odometry drift (m/s) along each local axis
    pub drift_per_s: Vector3<f64>,
}

impl Default for SimulatedTrajectory {
    fn default() -> Self {
        Self {
            radius_m: 20.0,
            angular_rate: 0.2,
            origin: GeoPoint {
                latitude: 47.3769,
                longitude: 8.5417,
                altitude: 408.0,
            },
            drift_per_s: Vector3::new(0.02, -0.01, 0.0),
        }
    }
}

impl SimulatedTrajectory {
    pub fn position(&self, t: f64) -> Vector3<f64> {
        let phase = self.angular_rate * t;
        Vector3::new(self.radius_m * phase.cos(), self.radius_m * phase.sin(), 0.0)
    }

    /// Heading tangent to the circle
    pub fn orientation(&self, t: f64) -> UnitQuaternion<f64> {
        let yaw = self.angular_rate * t + FRAC_PI_2.copysign(self.angular_rate);
        UnitQuaternion::from_euler_angles(0.0, 0.0, yaw)
    }

    pub fn ground_truth(&self, t: f64) -> StampedPose {
        StampedPose::new(t, self.position(t), self.orientation(t))
    }

    pub fn odometry(&self, t: f64) -> OdometrySample {
        OdometrySample::new(
            t,
            self.position(t) + self.drift_per_s * t,
            self.orientation(t),
        )
    }

    /// Fix at `t`; `accuracy` is passed through untouched
    pub fn fix(&self, t: f64, accuracy: f64) -> AbsoluteFix {
        AbsoluteFix {
            timestamp: t,
            position: self.to_geodetic(&self.position(t)),
            accuracy,
        }
    }

    /// Local ENU metres to latitude/longitude/altitude
    pub fn to_geodetic(&self, local: &Vector3<f64>) -> GeoPoint {
        let lat0 = self.origin.latitude.to_radians();
        GeoPoint {
            latitude: self.origin.latitude + (local.y / EARTH_RADIUS_M).to_degrees(),
            longitude: self.origin.longitude
                + (local.x / (EARTH_RADIUS_M * lat0.cos())).to_degrees(),
            altitude: self.origin.altitude + local.z,
        }
    }

    /// Inverse of [`Self::to_geodetic`]
    pub fn to_local(&self, point: &GeoPoint) -> Vector3<f64> {
        let lat0 = self.origin.latitude.to_radians();
        Vector3::new(
            (point.longitude - self.origin.longitude).to_radians() * EARTH_RADIUS_M * lat0.cos(),
            (point.latitude - self.origin.latitude).to_radians() * EARTH_RADIUS_M,
            point.altitude - self.origin.altitude,
        )
    }
}
