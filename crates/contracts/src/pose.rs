//! Stream samples and pose types.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Accuracy substituted for fixes that report a non-positive value.
pub const DEFAULT_FIX_ACCURACY: f64 = 1.0;

/// Local odometry estimate, produced once per odometry tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdometrySample {
    /// Sample time (seconds)
    pub timestamp: f64,

    /// Position in the odometry frame (meters)
    pub translation: Vector3<f64>,

    /// Orientation in the odometry frame
    pub orientation: UnitQuaternion<f64>,
}

impl OdometrySample {
    pub fn new(
        timestamp: f64,
        translation: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            timestamp,
            translation,
            orientation,
        }
    }
}

/// Geodetic position reported by an absolute fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,

    /// Altitude (meters)
    pub altitude: f64,
}

/// Low-rate, globally referenced position fix (GNSS).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteFix {
    /// Fix time (seconds)
    pub timestamp: f64,

    /// Reported position
    pub position: GeoPoint,

    /// Variance-like confidence scale, always > 0 once normalized
    pub accuracy: f64,
}

impl AbsoluteFix {
    /// Create a fix, normalizing a non-positive accuracy to [`DEFAULT_FIX_ACCURACY`].
    pub fn new(timestamp: f64, position: GeoPoint, accuracy: f64) -> Self {
        Self {
            timestamp,
            position,
            accuracy: normalize_accuracy(accuracy),
        }
    }

    /// Return a copy whose accuracy satisfies the `accuracy > 0` invariant.
    #[inline]
    pub fn normalized(self) -> Self {
        Self {
            accuracy: normalize_accuracy(self.accuracy),
            ..self
        }
    }
}

/// Map a reported accuracy onto the value handed to the fusion engine.
///
/// Non-positive (and NaN) values mean "unknown" upstream and are replaced by
/// [`DEFAULT_FIX_ACCURACY`]; positive values pass through unchanged.
#[inline]
pub fn normalize_accuracy(accuracy: f64) -> f64 {
    if accuracy > 0.0 {
        accuracy
    } else {
        DEFAULT_FIX_ACCURACY
    }
}

/// Timestamped 6-DoF pose, used for fused estimates and ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampedPose {
    /// Pose time (seconds)
    pub timestamp: f64,

    /// Position (meters)
    pub translation: Vector3<f64>,

    /// Orientation
    pub orientation: UnitQuaternion<f64>,
}

impl StampedPose {
    pub fn new(
        timestamp: f64,
        translation: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            timestamp,
            translation,
            orientation,
        }
    }

    /// Identity pose at the given time.
    pub fn identity(timestamp: f64) -> Self {
        Self::new(timestamp, Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Timestamp as integer nanoseconds, the join key of exported records.
    #[inline]
    pub fn timestamp_ns(&self) -> i64 {
        (self.timestamp * 1e9).round() as i64
    }
}

impl From<OdometrySample> for StampedPose {
    fn from(sample: OdometrySample) -> Self {
        Self::new(sample.timestamp, sample.translation, sample.orientation)
    }
}

/// The fusion engine's current best estimate.
pub type FusedPose = StampedPose;

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> GeoPoint {
        GeoPoint {
            latitude: 22.3,
            longitude: 114.2,
            altitude: 10.0,
        }
    }

    #[test]
    fn test_zero_accuracy_normalized() {
        let fix = AbsoluteFix::new(1.0, origin(), 0.0);
        assert_eq!(fix.accuracy, 1.0);
    }

    #[test]
    fn test_negative_accuracy_normalized() {
        let fix = AbsoluteFix::new(1.0, origin(), -3.5);
        assert_eq!(fix.accuracy, 1.0);
    }

    #[test]
    fn test_positive_accuracy_unchanged() {
        let fix = AbsoluteFix::new(1.0, origin(), 0.25);
        assert_eq!(fix.accuracy, 0.25);
    }

    #[test]
    fn test_normalized_repairs_literal_construction() {
        let fix = AbsoluteFix {
            timestamp: 1.0,
            position: origin(),
            accuracy: 0.0,
        };
        assert_eq!(fix.normalized().accuracy, 1.0);
        assert_eq!(normalize_accuracy(f64::NAN), 1.0);
    }

    #[test]
    fn test_timestamp_ns_rounds() {
        let pose = StampedPose::identity(1.000_000_000_4);
        assert_eq!(pose.timestamp_ns(), 1_000_000_000);

        let pose = StampedPose::identity(1634.1);
        assert_eq!(pose.timestamp_ns(), 1_634_100_000_000);
    }

    #[test]
    fn test_serde_roundtrip_keeps_orientation() {
        let pose = StampedPose::new(
            2.0,
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5),
        );
        let json = serde_json::to_string(&pose).unwrap();
        let back: StampedPose = serde_json::from_str(&json).unwrap();
        assert!((back.orientation.angle() - 0.5).abs() < 1e-12);
        assert_eq!(back.translation, pose.translation);
    }
}
