//! # Ingestion
//!
//! Producer side of the fusion node: simulated odometry, absolute-fix and ground-truth
//! streams derived from one reference trajectory.
//!
//! ```ignore
//! use ingestion::SimulatedSource;
//!
//! let source = SimulatedSource::new(blueprint.source.clone());
//! let streams = source.start(100)?;
//! while let Some(sample) = streams.odometry.recv().await {
//!     synchronizer.process(&sample);
//! }
//! ```

mod error;
mod source;
mod trajectory;

pub use error::{IngestionError, Result};
pub use source::{SimulatedSource, SimulatedStreams};
pub use trajectory::{EARTH_RADIUS_M, SimulatedTrajectory};
