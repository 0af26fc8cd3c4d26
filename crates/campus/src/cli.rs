//! Clap derive structures for the `campus` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use strum::IntoEnumIterator;

use campus_core::ResourceKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// campus -- kubectl-style CLI for the school-management services
#[derive(Debug, Parser)]
#[command(
    name = "campus",
    version,
    about = "Read and change school-management resources from the command line",
    long_about = "Reads go through the campus cache layer: identical requests are shared, \
        related views are invalidated after every write.\n\n\
        Run `campus resources` for the resource types and their endpoints.",
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
    /// Deployment profile to use
    #[arg(long, short = 'p', env = "CAMPUS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API gateway URL (overrides profile)
    #[arg(long, short = 'g', env = "CAMPUS_GATEWAY", global = true)]
    pub gateway: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAMPUS_OUTPUT",
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
    #[arg(long, short = 'k', env = "CAMPUS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CAMPUS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// List resource types, their endpoints and what a write invalidates
    #[command(alias = "kinds")]
    Resources,

    /// List records of one resource type
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    Get {
        /// Resource type (e.g. students, feePayments)
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        /// Record id
        id: String,
    },

    /// Create a record
    Create {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Update a record
    Update {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        id: String,
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        id: String,
    },

    /// Follow a list and print every state change
    Watch(WatchArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource type (e.g. students, feePayments)
    #[arg(value_parser = parse_kind)]
    pub kind: ResourceKind,

    /// Filter as key=value; values are read as JSON when they parse
    #[arg(long = "filter", short = 'f', value_parser = parse_filter)]
    pub filters: Vec<(String, Value)>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Invalidate and refetch this often (e.g. 30s, 5m)
    #[arg(long, short = 'i', default_value = "30s", value_parser = humantime::parse_duration)]
    pub interval: Duration,
}

/// Request body, inline or from a file.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct BodyArgs {
    /// JSON body
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, short = 'F')]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_kind(raw: &str) -> Result<ResourceKind, String> {
    raw.parse().map_err(|_| {
        let known: Vec<&str> = ResourceKind::iter().map(ResourceKind::as_str).collect();
        format!("unknown resource type '{raw}' (expected one of: {})", known.join(", "))
    })
}

fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty filter key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
