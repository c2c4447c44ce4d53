use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(
    name = "trowgc",
    about = "Garbage collector for orphaned blobs in a Trow registry",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with collector and transport settings
    #[arg(long, global = true, env = "TROWGC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a cycle, sleep for the poll interval, repeat until interrupted
    Run(GcArgs),
    /// Run a single cycle and exit
    Once(GcArgs),
    /// Print the effective configuration
    Config(GcArgs),
}

impl Command {
    pub fn gc_args(&self) -> &GcArgs {
        match self {
            Self::Run(args) | Self::Once(args) | Self::Config(args) => args,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct GcArgs {
    /// Minimum age in seconds before an unreferenced blob is deleted
    #[arg(long, env = "MIN_GC_BLOB_AGE", allow_negative_numbers = true)]
    pub min_blob_age: Option<i64>,

    /// Seconds to wait between cycles
    #[arg(long, env = "POLL_INTERVAL", allow_negative_numbers = true)]
    pub poll_interval: Option<i64>,

    /// Report what would be deleted without deleting it
    #[arg(
        long,
        env = "DRY_RUN",
        value_parser = parse_truthy,
        num_args = 0..=1,
        default_missing_value = "true",
    )]
    pub dry_run: Option<bool>,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Clone, Debug, Default)]
pub struct BackendArgs {
    /// How to reach the registry volume
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Namespace of the registry pod
    #[arg(long, env = "TROW_NAMESPACE")]
    pub namespace: Option<String>,

    /// Name of the registry pod
    #[arg(long, env = "TROW_POD")]
    pub pod: Option<String>,

    /// Root of the registry volume
    #[arg(long)]
    pub root: Option<String>,

    /// kubectl executable
    #[arg(long)]
    pub kubectl: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `kubectl exec` into the registry pod
    #[default]
    Kubectl,
    /// Registry volume mounted locally
    Local,
}

/// `true`, `y`, `yes` and `1` (any case) are true; anything else is false.
pub fn parse_truthy(value: &str) -> Result<bool, String> {
    Ok(matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "y" | "yes" | "1"
    ))
}
