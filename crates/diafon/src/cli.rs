//! Clap derive structures for the `diafon` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// diafon -- DiafonBox video intercom from the command line
#[derive(Debug, Parser)]
#[command(
    name = "diafon",
    version,
    about = "Open the door and watch the doorbell of a Multitek DiafonBox intercom",
    long_about = "Talks to the Multitek DiafonBox cloud on behalf of a registered phone.\n\n\
        Lists locations and call history, opens the door, downloads ring\n\
        snapshots, and watches for doorbell rings.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "DIAFON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account e-mail (overrides profile)
    #[arg(long, short = 'e', env = "DIAFON_EMAIL", global = true)]
    pub email: Option<String>,

    /// Registered phone id (overrides profile)
    #[arg(long, env = "DIAFON_PHONE_ID", global = true)]
    pub phone_id: Option<String>,

    /// Vendor service root (overrides profile)
    #[arg(long, env = "DIAFON_API_URL", global = true, hide_env = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DIAFON_OUTPUT",
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

    /// Request timeout in seconds
    #[arg(long, env = "DIAFON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register an account profile and validate it against the cloud
    Setup(SetupArgs),

    /// Open the door of a location
    #[command(alias = "open")]
    OpenDoor(OpenDoorArgs),

    /// List locations and their door units
    #[command(alias = "loc")]
    Locations,

    /// Query call history
    Calls(CallsArgs),

    /// Show entity states (locks, doorbells, cameras, sensors)
    #[command(alias = "ent")]
    Entities(EntitiesArgs),

    /// Download the snapshot of the latest ring
    Snapshot(SnapshotArgs),

    /// Stream doorbell rings, door openings and entity changes
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETUP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Phone id to register (generated when omitted)
    #[arg(long = "device-id")]
    pub device_id: Option<String>,

    /// Prompt for the account password
    #[arg(long)]
    pub ask_password: bool,

    /// Read the password from this environment variable at runtime
    #[arg(long, conflicts_with = "ask_password")]
    pub password_env: Option<String>,

    /// Save without contacting the cloud
    #[arg(long)]
    pub no_validate: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DOOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct OpenDoorArgs {
    /// Location id (defaults to the first location with a door unit)
    #[arg(long, short = 'l')]
    pub location: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CALLS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CallsArgs {
    #[command(subcommand)]
    pub command: CallsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CallsCommand {
    /// List call history, newest first
    #[command(alias = "ls")]
    List {
        /// Only calls of this location
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// Only missed calls (doorbell rings)
        #[arg(long)]
        missed: bool,

        /// Max results
        #[arg(long, short = 'n', default_value = "25")]
        limit: usize,
    },

    /// Calls within the last few minutes
    Recent {
        /// Window in minutes
        #[arg(long, short = 'm', default_value = "1")]
        minutes: u64,

        /// Only calls to this destination (room id)
        #[arg(long)]
        to: Option<String>,
    },

    /// Number of calls since local midnight
    Today,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENTITIES / SNAPSHOT / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Only entities of this location
    #[arg(long, short = 'l')]
    pub location: Option<String>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Location id (defaults to the first location)
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Where to write the image
    #[arg(long = "out", short = 'O', default_value = "snapshot.jpg")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between periodic refreshes (profile value when omitted)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Rely on polling only
    #[arg(long)]
    pub no_push: bool,

    /// Only print domain events, not entity changes
    #[arg(long)]
    pub events_only: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (passwords masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
