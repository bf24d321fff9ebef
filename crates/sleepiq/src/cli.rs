//! Clap derive structures for the `sleepiq` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sleepiq_core::{Actuator, Side};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sleepiq -- bridge and control SleepIQ smart beds
#[derive(Debug, Parser)]
#[command(
    name = "sleepiq",
    version,
    about = "Bridge SleepIQ smart beds and control them from the command line",
    long_about = "Polls the SleepIQ cloud for bed occupancy, firmness and foundation\n\
        state, and exposes each bed facet as a smart-home accessory.",
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
    #[arg(long, short = 'p', env = "SLEEPIQ_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account email (overrides profile)
    #[arg(long, short = 'e', global = true)]
    pub email: Option<String>,

    /// API root (overrides profile)
    #[arg(long, env = "SLEEPIQ_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SLEEPIQ_OUTPUT",
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
    #[arg(long, env = "SLEEPIQ_TIMEOUT", global = true)]
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
    /// Run the bridge until interrupted
    Run(RunArgs),

    /// Show current bed state
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Change a bed setting
    Set(SetArgs),

    /// Show air pump state and the account id
    Pump(PumpArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Accessory cache file (defaults to accessories.json in the data dir)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Seconds between polls (overrides profile)
    #[arg(long)]
    pub refresh: Option<u64>,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show this bed
    #[arg(long, short = 'b')]
    pub bed: Option<String>,
}

// ── Pump ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PumpArgs {
    /// Only show this bed
    #[arg(long, short = 'b')]
    pub bed: Option<String>,
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Bed id (defaults to the first bed on the account)
    #[arg(long, short = 'b', global = true)]
    pub bed: Option<String>,

    #[command(subcommand)]
    pub command: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Set one side's firmness (5-100, snapped to steps of 5)
    #[command(alias = "number")]
    SleepNumber {
        side: SideArg,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        value: u8,
    },

    /// Turn privacy (pause) mode on or off
    Privacy { state: Toggle },

    /// Switch one side's foundation outlet
    Outlet { side: SideArg, state: Toggle },

    /// Switch one side's under-bed light strip
    Light { side: SideArg, state: Toggle },

    /// Set one side's foot warmer (0 off, 1 low, 2 medium, 3 high)
    FootWarmer {
        side: SideArg,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
        level: u8,
    },

    /// Move one side's head or foot actuator (0-100)
    Flex {
        side: SideArg,
        actuator: ActuatorArg,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        position: u8,
    },

    /// Stop the air pump mid-adjustment
    ForceIdle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActuatorArg {
    Head,
    Foot,
}

impl From<ActuatorArg> for Actuator {
    fn from(actuator: ActuatorArg) -> Self {
        match actuator {
            ActuatorArg::Head => Actuator::Head,
            ActuatorArg::Foot => Actuator::Foot,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the current configuration (secrets masked)
    Show,

    /// Set a key on the active profile
    Set { key: String, value: String },

    /// Store the active profile's password in the system keyring
    SetPassword {
        /// Profile to update (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: clap_complete::Shell,
}
