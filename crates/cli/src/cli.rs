//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fusion-sync - GNSS / odometry stream synchronization node
#[derive(Parser, Debug)]
#[command(
    name = "fusion-sync",
    author,
    version,
    about = "GNSS / odometry stream synchronization node",
    long_about = "Pairs low-rate absolute position fixes with high-rate odometry, feeds a \n\
                  fusion engine and relays the fused pose to configured sinks.\n\n\
                  Without a configuration file the built-in simulated streams are used."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FUSION_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FUSION_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synchronization pipeline
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "FUSION_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the fix matching tolerance (seconds)
    #[arg(long, env = "FUSION_SYNC_TOLERANCE")]
    pub tolerance: Option<f64>,

    /// Override the simulated run length (seconds)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Replay the simulated streams as fast as possible
    #[arg(long)]
    pub no_realtime: bool,

    /// Stop after this many odometry samples (0 = unlimited)
    #[arg(long, default_value = "0", env = "FUSION_SYNC_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FUSION_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Directory for the trajectory CSV export (overrides export.saving_path)
    #[arg(long, env = "FUSION_SYNC_SAVING_PATH")]
    pub saving_path: Option<PathBuf>,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "FUSION_SYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running the pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "fusion-sync",
            "-v",
            "run",
            "--tolerance",
            "0.02",
            "--max-samples",
            "100",
            "--saving-path",
            "/tmp/out",
            "--no-realtime",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.tolerance, Some(0.02));
                assert_eq!(args.max_samples, 100);
                assert_eq!(args.saving_path, Some(PathBuf::from("/tmp/out")));
                assert!(args.no_realtime);
                assert!(args.config.is_none());
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fusion-sync", "-q", "-v", "info"]).is_err());
    }
}
