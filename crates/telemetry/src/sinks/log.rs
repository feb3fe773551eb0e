//! LogSink - one tracing line per frame

use contracts::{ContractError, TelemetryFrame, TelemetrySink};
use tracing::{info, instrument};

/// Sink that logs a frame summary for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_frame_summary(&self, frame: &TelemetryFrame) {
        let p = frame.fused.translation;
        info!(
            sink = %self.name,
            sequence = frame.sequence,
            frame = %frame.world_frame_id,
            t = frame.fused.timestamp,
            x = p.x,
            y = p.y,
            z = p.z,
            matched = frame.sync.matched,
            stale = frame.sync.stale_dropped,
            pending = frame.sync.pending_fixes,
            ground_truth = frame.ground_truth.is_some(),
            "Fused pose"
        );
    }
}

impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, sequence = frame.sequence)
    )]
    async fn write(&mut self, frame: &TelemetryFrame) -> Result<(), ContractError> {
        self.log_frame_summary(frame);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
