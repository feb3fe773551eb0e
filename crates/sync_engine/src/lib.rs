//! # Sync Engine
//!
//! Synchronization layer between the odometry stream and the absolute-fix stream.
//!
//! Responsibilities:
//! - Buffer absolute fixes in arrival order (`AbsoluteFixBuffer`)
//! - Reconcile each odometry sample against the buffer with a fixed tolerance
//!   (`StreamSynchronizer`): drop stale fixes, match at most one, defer future ones
//! - Forward odometry and the matched fix to a `FusionPort` and read back the fused pose
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_engine::{AbsoluteFixBuffer, PassthroughFusion, StreamSynchronizer, SyncConfig};
//!
//! let config = SyncConfig::default();
//! let buffer = Arc::new(AbsoluteFixBuffer::new(&config.buffer));
//! let mut sync = StreamSynchronizer::new(&config, Arc::clone(&buffer), PassthroughFusion::new());
//!
//! // Fix producer path
//! buffer.push(fix)?;
//!
//! // Odometry path
//! let outcome = sync.process(&sample);
//! ```

mod buffer;
mod passthrough;
mod synchronizer;

pub use buffer::{AbsoluteFixBuffer, FixBufferStats, Reconciliation};
pub use passthrough::{PassthroughFusion, RegisteredFix};
pub use synchronizer::{StreamSynchronizer, SynchronizerStats};

// Re-export contracts types
pub use contracts::{
    AbsoluteFix, FixBufferConfig, FusionPort, OdometrySample, OverflowPolicy, SyncConfig,
    SyncOutcome,
};
