//! FusionBlueprint - Config Loader output
//!
//! Describes a complete node configuration: synchronizer tuning, telemetry routing, export
//! location and the simulated producer streams.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::SyncConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Stream synchronizer settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Telemetry relay settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Shutdown export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Producer stream settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for FusionBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            sync: SyncConfig::default(),
            telemetry: TelemetryConfig::default(),
            export: ExportConfig::default(),
            source: SourceConfig::default(),
            sinks: vec![SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: default_queue_capacity(),
                backpressure: false,
                params: HashMap::new(),
            }],
        }
    }
}

/// Telemetry relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Frame id attached to every fused pose
    #[serde(default = "default_world_frame_id")]
    pub world_frame_id: String,

    /// Capacity of the relay input channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            world_frame_id: default_world_frame_id(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_world_frame_id() -> String {
    "world".to_string()
}

fn default_channel_capacity() -> usize {
    100
}

/// Trajectory export written once at shutdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output directory; export is disabled when unset
    #[serde(default)]
    pub saving_path: Option<PathBuf>,
}

/// Simulated producer streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Odometry rate (Hz)
    #[serde(default = "default_odometry_hz")]
    pub odometry_hz: f64,

    /// Absolute fix rate (Hz)
    #[serde(default = "default_fix_hz")]
    pub fix_hz: f64,

    /// Delivery delay of fixes relative to their timestamp (seconds)
    #[serde(default)]
    pub fix_latency_s: f64,

    /// Accuracy reported by the fix stream (<= 0 means "unknown")
    #[serde(default = "default_fix_accuracy")]
    pub fix_accuracy: f64,

    /// Length of the simulated run (seconds)
    #[serde(default = "default_duration")]
    pub duration_s: f64,

    /// Publish the ground-truth stream
    #[serde(default = "default_true")]
    pub ground_truth: bool,

    /// Pace samples in wall-clock time; off replays as fast as possible
    #[serde(default = "default_true")]
    pub realtime: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            odometry_hz: default_odometry_hz(),
            fix_hz: default_fix_hz(),
            fix_latency_s: 0.0,
            fix_accuracy: default_fix_accuracy(),
            duration_s: default_duration(),
            ground_truth: true,
            realtime: true,
        }
    }
}

fn default_odometry_hz() -> f64 {
    20.0
}

fn default_fix_hz() -> f64 {
    5.0
}

fn default_fix_accuracy() -> f64 {
    2.0
}

fn default_duration() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

/// Sink output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Wait for queue space instead of dropping the frame when the queue is full.
    /// The relay then runs at the pace of this sink.
    #[serde(default)]
    pub backpressure: bool,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// Newline-delimited JSON file
    File,
}
