//! Sink implementations
//!
//! log (tracing), file (JSON lines).

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
