//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the data carried by the
//! odometry, absolute-fix and ground-truth streams, the `FusionPort` seam to the external fusion
//! engine, the `TelemetrySink` output trait, configuration types and the unified error type.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are seconds as `f64` on the producers' shared clock
//! - Each stream is expected (not guaranteed) to be non-decreasing in time
//! - Exported records use integer nanoseconds (`round(t * 1e9)`)

mod blueprint;
mod error;
mod fusion;
mod pose;
mod sink;
mod sync_config;
mod telemetry;

pub use blueprint::*;
pub use error::*;
pub use fusion::FusionPort;
pub use pose::*;
pub use sink::*;
pub use sync_config::*;
pub use telemetry::*;

pub use nalgebra::{UnitQuaternion, Vector3};
