//! TelemetrySink trait - relay output interface

use crate::{ContractError, TelemetryFrame};

/// Telemetry output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(TelemetrySink: Send)]
pub trait LocalTelemetrySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one telemetry frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &TelemetryFrame) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
