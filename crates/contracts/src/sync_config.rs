//! Synchronizer configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

/// Default matching tolerance (10 ms)
pub const DEFAULT_TOLERANCE_S: f64 = 0.01;

/// Stream synchronizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Half-width of the matching window around each odometry timestamp (seconds)
    #[serde(default = "default_tolerance")]
    pub tolerance_s: f64,

    /// Pending-fix buffer configuration
    #[serde(default)]
    pub buffer: FixBufferConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tolerance_s: DEFAULT_TOLERANCE_S,
            buffer: FixBufferConfig::default(),
        }
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_S
}

/// Absolute-fix buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixBufferConfig {
    /// Maximum number of pending fixes
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Behavior when a push finds the buffer full
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

impl Default for FixBufferConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

fn default_max_size() -> usize {
    256
}

/// Capacity policy of the absolute-fix buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending fix to make room
    #[default]
    DropOldest,
    /// Refuse the incoming fix with `BufferOverflow`
    RejectNewest,
}
