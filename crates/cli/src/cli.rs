//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Splitter simulator - drive scripted audio frames through the splitter
#[derive(Parser, Debug)]
#[command(
    name = "splitter-sim",
    author,
    version,
    about = "Audio splitter simulator",
    long_about = "Feeds generated audio frames with scripted metadata through the splitter.\n\n\
                  Ports, metadata allow-lists and the simulation script are read from a \n\
                  TOML or JSON configuration file."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SPLITTER_SIM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SPLITTER_SIM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "splitter.toml",
        env = "SPLITTER_SIM_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of frames to generate (overrides the simulation script)
    #[arg(long, env = "SPLITTER_SIM_FRAMES")]
    pub frames: Option<u64>,

    /// Pace frames at the configured frame duration
    #[arg(long)]
    pub realtime: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SPLITTER_SIM_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "splitter.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "splitter.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the scripted metadata and port changes
    #[arg(long)]
    pub script: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
