//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{FusionBlueprint, SinkType};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    tolerance_s: f64,
    buffer_max_size: usize,
    sink_count: usize,
    export_enabled: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                tolerance_s: blueprint.sync.tolerance_s,
                buffer_max_size: blueprint.sync.buffer.max_size,
                sink_count: blueprint.sinks.len(),
                export_enabled: blueprint.export.saving_path.is_some(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(blueprint: &FusionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - fused poses are only exported".to_string());
    }

    let period = 1.0 / blueprint.source.odometry_hz;
    if 2.0 * blueprint.sync.tolerance_s >= period {
        warnings.push(format!(
            "Matching window ({:.3}s) spans an odometry period ({:.3}s) - fixes may match early",
            2.0 * blueprint.sync.tolerance_s,
            period
        ));
    }

    if blueprint.source.fix_accuracy <= 0.0 {
        warnings.push("source.fix_accuracy <= 0 - fixes will use accuracy 1.0".to_string());
    }

    if blueprint.export.saving_path.is_none()
        && !blueprint
            .sinks
            .iter()
            .any(|s| s.sink_type == SinkType::File)
    {
        warnings.push("No export path and no file sink - nothing is persisted".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Tolerance: {} s", summary.tolerance_s);
            println!("  Fix buffer: {}", summary.buffer_max_size);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Export: {}", summary.export_enabled);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
