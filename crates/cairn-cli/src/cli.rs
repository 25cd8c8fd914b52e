use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Cairn: content-addressed storage for backup repositories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Repository directory (filesystem storage).
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Server/repository config file (TOML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the content server
    Serve(ServeArgs),
    /// Store a file (or stdin) and print its content ID
    Put(PutArgs),
    /// Print stored content
    Get(GetArgs),
    /// Show metadata for stored content
    Info(InfoArgs),
    /// Compute the content ID of a file without storing it
    Address(AddressArgs),
    /// List registered compression algorithms
    Algorithms,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
    /// Serve through a read-only handle
    #[arg(long)]
    pub read_only: bool,
}

/// Shared write options.
#[derive(Args, Clone, Debug)]
pub struct EncodeArgs {
    /// Namespace prefix character (`g`..`z`, except `m`)
    #[arg(short, long)]
    pub prefix: Option<char>,
    /// Compression by name (`zstd`, `gzip-best-speed`, ...) or hex header
    #[arg(short = 'z', long)]
    pub compression: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    /// File to store; reads stdin when omitted
    pub path: Option<PathBuf>,
    #[command(flatten)]
    pub encode: EncodeArgs,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InfoArgs {
    pub id: String,
}

#[derive(Args)]
pub struct AddressArgs {
    /// File to address; reads stdin when omitted
    pub path: Option<PathBuf>,
    #[command(flatten)]
    pub encode: EncodeArgs,
}
