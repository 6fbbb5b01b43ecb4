use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sift",
    about = "Sift: namespaced JSON document store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Store a document in a log directory
    Put(PutArgs),
    /// Read a document from a log directory
    Get(GetArgs),
    /// Rewrite a log directory keeping only live documents
    Compact(CompactArgs),
    /// Parse a config file and print the effective settings
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Persist documents in this directory (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(long)]
    pub data_dir: PathBuf,
    pub namespace: String,
    pub id: String,
    /// Document as JSON text
    pub document: String,
}

#[derive(Args)]
pub struct GetArgs {
    #[arg(long)]
    pub data_dir: PathBuf,
    pub namespace: String,
    pub id: String,
}

#[derive(Args)]
pub struct CompactArgs {
    #[arg(long)]
    pub data_dir: PathBuf,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}
