//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap::ValueHint;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "firmex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Format of diagnostic logs written to stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract firmware artifacts from an IPSW or OTA archive
    Extract(ExtractArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive, or its URL with --remote
    #[arg(value_name = "ARCHIVE", value_hint = ValueHint::FilePath)]
    pub archive: String,

    /// Read the archive over HTTP without downloading it
    #[arg(short, long)]
    pub remote: bool,

    /// Extract the kernelcache
    #[arg(short, long)]
    pub kernel: bool,

    /// Extract the dyld_shared_cache (local archives only)
    #[arg(short, long)]
    pub dyld: bool,

    /// Extract DeviceTree images
    #[arg(short = 't', long)]
    pub dtree: bool,

    /// Extract the root filesystem DMG (local archives only)
    #[arg(short = 'f', long)]
    pub dmg: bool,

    /// Extract iBoot images
    #[arg(short, long)]
    pub iboot: bool,

    /// Extract SEP firmware
    #[arg(short, long)]
    pub sep: bool,

    /// Extract entries whose name matches this regex (case-insensitive)
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// dyld_shared_cache architecture to keep (repeatable: arm64, arm64e, x86_64, x86_64h)
    #[arg(short = 'a', long = "dyld-arch", value_name = "ARCH")]
    pub dyld_arch: Vec<String>,

    /// HTTP(S) proxy for remote archives
    #[arg(long, value_name = "URL", requires = "remote")]
    pub proxy: Option<String>,

    /// Accept invalid TLS certificates for remote archives
    #[arg(long, requires = "remote")]
    pub insecure: bool,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
