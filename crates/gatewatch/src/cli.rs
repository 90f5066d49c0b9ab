//! Clap derive structures for the `gatewatch` CLI.
//!
//! Kept free of workspace crate types so `build.rs` can include it
//! directly for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gatewatch -- live view and configuration for device gateways
#[derive(Debug, Parser)]
#[command(
    name = "gatewatch",
    version,
    about = "Monitor and configure industrial device gateways",
    long_about = "Reconciles the gateway's configured devices with its live telemetry \
        and reports each device as online, offline or unknown.\n\n\
        Telemetry arrives over the gateway's push channel, or by polling \
        GET /data with --mode poll.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "GATEWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway API base URL (overrides profile)
    #[arg(long, short = 'g', env = "GATEWATCH_GATEWAY", global = true)]
    pub gateway: Option<String>,

    /// Telemetry channel (overrides profile)
    #[arg(long, short = 'm', env = "GATEWATCH_MODE", global = true)]
    pub mode: Option<ModeArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GATEWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "GATEWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "GATEWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Shared Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one device name per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// WebSocket push channel
    Push,
    /// Periodic GET /data
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Production line counter
    Oee,
    /// Power meter
    Pm,
    /// Weighing scale
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Online,
    Offline,
    Unknown,
    /// Telemetry exists but is not trusted
    Stale,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configured devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show the gateway's default power-meter parameter map
    PmDefaults,

    /// One-shot reconciled view of every configured device
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Live reconciled view until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── View filters ─────────────────────────────────────────────────────

/// Narrowing options shared by `status` and `watch`.
#[derive(Debug, Args)]
pub struct ViewFilterArgs {
    /// Only show these devices (comma-separated or repeated)
    #[arg(long, short = 's', value_delimiter = ',')]
    pub select: Vec<String>,

    /// Only show devices of this type
    #[arg(long)]
    pub kind: Option<KindArg>,

    /// Only show devices in this state
    #[arg(long)]
    pub state: Option<StateArg>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub filter: ViewFilterArgs,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filter: ViewFilterArgs,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List configured devices
    #[command(alias = "ls")]
    List {
        /// Only list devices of this type
        #[arg(long)]
        kind: Option<KindArg>,
    },

    /// Show one device's configuration
    Get {
        /// Device name
        name: String,
    },

    /// Register a new device
    #[command(alias = "create")]
    Add(DeviceAddArgs),

    /// Edit an existing device
    #[command(alias = "edit")]
    Update(DeviceUpdateArgs),

    /// Remove a device
    #[command(alias = "rm", alias = "delete")]
    Remove {
        /// Device name
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct DeviceAddArgs {
    /// Unique device name
    pub name: String,

    /// Device type
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub kind: KindArg,

    /// Device IP address or hostname
    #[arg(long)]
    pub ip: String,

    /// Modbus TCP port
    #[arg(long, default_value = "502")]
    pub port: u16,

    /// Modbus slave id
    #[arg(long, default_value = "1")]
    pub slave_id: u8,

    /// Power-meter parameter as NAME=ADDRESS (repeatable, pm only)
    #[arg(long = "pm-param", value_name = "NAME=ADDRESS")]
    pub pm_params: Vec<String>,

    /// Seed the parameter map from the gateway's defaults (pm only)
    #[arg(long, conflicts_with = "pm_params")]
    pub pm_defaults: bool,
}

#[derive(Debug, Args)]
pub struct DeviceUpdateArgs {
    /// Current device name
    pub name: String,

    /// New device name
    #[arg(long)]
    pub rename: Option<String>,

    /// New device type
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub kind: Option<KindArg>,

    /// New IP address or hostname
    #[arg(long)]
    pub ip: Option<String>,

    /// New Modbus TCP port
    #[arg(long)]
    pub port: Option<u16>,

    /// New Modbus slave id
    #[arg(long)]
    pub slave_id: Option<u8>,

    /// Replace the parameter map, NAME=ADDRESS (repeatable, pm only)
    #[arg(long = "pm-param", value_name = "NAME=ADDRESS")]
    pub pm_params: Vec<String>,

    /// Drop the custom parameter map and use the gateway's defaults
    #[arg(long, conflicts_with = "pm_params")]
    pub clear_pm_params: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective configuration
    Show,

    /// Create or replace a gateway profile
    Init,

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
