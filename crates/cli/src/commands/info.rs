//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::FusionBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    version: String,
    sync: &'a contracts::SyncConfig,
    telemetry: &'a contracts::TelemetryConfig,
    source: &'a contracts::SourceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    saving_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info<'a>(blueprint: &'a FusionBlueprint, args: &InfoArgs) -> ConfigInfo<'a> {
    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sync: &blueprint.sync,
        telemetry: &blueprint.telemetry,
        source: &blueprint.source,
        saving_path: blueprint
            .export
            .saving_path
            .as_ref()
            .map(|p| p.display().to_string()),
        sinks,
    }
}

fn print_config_info(blueprint: &FusionBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Fusion Sync Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let sync = &blueprint.sync;
    println!("⚙️  Sync");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Tolerance: {} s", sync.tolerance_s);
    println!("   ├─ Fix buffer: {}", sync.buffer.max_size);
    println!("   └─ Overflow: {:?}", sync.buffer.overflow_policy);

    let source = &blueprint.source;
    println!("\n🛰  Source");
    println!("   ├─ Odometry: {} Hz", source.odometry_hz);
    println!(
        "   ├─ Fixes: {} Hz (latency {} s, accuracy {})",
        source.fix_hz, source.fix_latency_s, source.fix_accuracy
    );
    println!("   ├─ Ground truth: {}", source.ground_truth);
    println!(
        "   └─ Duration: {} s ({})",
        source.duration_s,
        if source.realtime { "realtime" } else { "fast" }
    );

    println!("\n📤 Telemetry");
    println!("   ├─ World frame: {}", blueprint.telemetry.world_frame_id);
    match &blueprint.export.saving_path {
        Some(path) => println!("   ├─ Export: {}", path.display()),
        None => println!("   ├─ Export: disabled"),
    }
    if args.sinks && !blueprint.sinks.is_empty() {
        println!("   └─ Sinks ({}):", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let prefix = if i == blueprint.sinks.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "       {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    } else {
        println!("   └─ {} sinks", blueprint.sinks.len());
    }

    println!();
}
