//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::FusionBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            load_blueprint(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using built-in defaults");
            FusionBlueprint::default()
        }
    };

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        tolerance_s = blueprint.sync.tolerance_s,
        max_fixes = blueprint.sync.buffer.max_size,
        overflow = ?blueprint.sync.buffer.overflow_policy,
        sinks = blueprint.sinks.len(),
        export = ?blueprint.export.saving_path,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let mut pipeline_config = PipelineConfig::new(blueprint);
    pipeline_config.max_samples = (args.max_samples > 0).then_some(args.max_samples);
    pipeline_config.timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    pipeline_config.metrics_port = (args.metrics_port > 0).then_some(args.metrics_port);

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        samples = stats.samples_processed,
        frames = stats.frames_emitted,
        duration_secs = stats.duration.as_secs_f64(),
        rate_hz = format!("{:.2}", stats.sample_rate()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("fusion-sync finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut FusionBlueprint, args: &RunArgs) {
    if let Some(tolerance) = args.tolerance {
        info!(tolerance_s = tolerance, "Overriding tolerance from CLI");
        blueprint.sync.tolerance_s = tolerance;
    }
    if let Some(duration) = args.duration {
        blueprint.source.duration_s = duration;
    }
    if args.no_realtime {
        blueprint.source.realtime = false;
    }
    if let Some(ref path) = args.saving_path {
        info!(path = %path.display(), "Overriding export path from CLI");
        blueprint.export.saving_path = Some(path.clone());
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, stopping pipeline...");
}

fn print_config_summary(blueprint: &FusionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sync:");
    println!("  Tolerance: {} s", blueprint.sync.tolerance_s);
    println!(
        "  Fix buffer: {} ({:?})",
        blueprint.sync.buffer.max_size, blueprint.sync.buffer.overflow_policy
    );

    let source = &blueprint.source;
    println!("\nSource:");
    println!(
        "  Odometry: {} Hz, fixes: {} Hz (latency {} s, accuracy {})",
        source.odometry_hz, source.fix_hz, source.fix_latency_s, source.fix_accuracy
    );
    println!(
        "  Duration: {} s, ground truth: {}",
        source.duration_s, source.ground_truth
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    match &blueprint.export.saving_path {
        Some(path) => println!("\nExport: {}", path.display()),
        None => println!("\nExport: disabled"),
    }

    println!();
}
