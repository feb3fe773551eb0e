//! Configuration validation
//!
//! Rules:
//! - sync.tolerance_s finite and > 0
//! - sync.buffer.max_size > 0
//! - telemetry.world_frame_id non-empty, channel_capacity > 0
//! - source rates > 0 with a representable period, duration >= 0, latency >= 0 and
//!   representable as a `Duration`
//! - sink names non-empty and unique, queue_capacity > 0
//! - file sinks, when given a `path`, give a non-empty one

use std::collections::HashSet;
use std::time::Duration;

use contracts::{ContractError, FusionBlueprint, SinkType};

/// Validate a FusionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    validate_sync_config(blueprint)?;
    validate_telemetry(blueprint)?;
    validate_source(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_sync_config(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let sync = &blueprint.sync;

    if !sync.tolerance_s.is_finite() || sync.tolerance_s <= 0.0 {
        return Err(ContractError::config_validation(
            "sync.tolerance_s",
            format!("tolerance_s must be a finite value > 0, got {}", sync.tolerance_s),
        ));
    }

    if sync.buffer.max_size == 0 {
        return Err(ContractError::config_validation(
            "sync.buffer.max_size",
            "max_size must be > 0",
        ));
    }

    Ok(())
}

fn validate_telemetry(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let telemetry = &blueprint.telemetry;

    if telemetry.world_frame_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "telemetry.world_frame_id",
            "world_frame_id cannot be empty",
        ));
    }

    if telemetry.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "telemetry.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }

    Ok(())
}

fn validate_source(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let source = &blueprint.source;

    for (field, value) in [
        ("source.odometry_hz", source.odometry_hz),
        ("source.fix_hz", source.fix_hz),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("rate must be > 0, got {value}"),
            ));
        }
        if Duration::try_from_secs_f64(value.recip()).is_err() {
            return Err(ContractError::config_validation(
                field,
                format!("rate {value} gives a sample period out of range"),
            ));
        }
    }

    for (field, value) in [
        ("source.duration_s", source.duration_s),
        ("source.fix_latency_s", source.fix_latency_s),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("value must be >= 0, got {value}"),
            ));
        }
    }

    if Duration::try_from_secs_f64(source.fix_latency_s).is_err() {
        return Err(ContractError::config_validation(
            "source.fix_latency_s",
            format!("latency {} is out of range", source.fix_latency_s),
        ));
    }

    Ok(())
}

fn validate_sinks(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::File
            && sink.params.get("path").is_some_and(|p| p.trim().is_empty())
        {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink path cannot be empty",
            ));
        }
    }
    Ok(())
}
