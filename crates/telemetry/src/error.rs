//! Telemetry error types

use thiserror::Error;

/// Telemetry-specific errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Queue full - frame dropped
    #[error("queue full for sink '{sink_name}', frame {sequence} dropped")]
    QueueFull { sink_name: String, sequence: u64 },

    /// Relay task ended abnormally
    #[error("relay task failed: {0}")]
    RelayJoin(String),

    /// Sink or export error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
