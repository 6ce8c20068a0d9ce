use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ocfl_types::{InteractionModel, VersionNum};

#[derive(Parser)]
#[command(
    name = "ocfl",
    about = "Stage and commit versions of OCFL objects",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage root of the object store
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Session configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

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

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ModelArg {
    Rdf,
    NonRdf,
    AclRdf,
    AclNonRdf,
}

impl From<ModelArg> for InteractionModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::Rdf => InteractionModel::Rdf,
            ModelArg::NonRdf => InteractionModel::NonRdf,
            ModelArg::AclRdf => InteractionModel::AclRdf,
            ModelArg::AclNonRdf => InteractionModel::AclNonRdf,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a resource from a file and commit it as a new version
    Write(WriteArgs),
    /// Delete a resource's content, keeping its headers as a tombstone
    Delete(DeleteArgs),
    /// Remove a resource's content and headers
    Purge(DeleteArgs),
    /// Print a resource's content
    Cat(ReadArgs),
    /// Print a resource's headers
    Headers(ReadArgs),
    /// Show an object's version history
    Log(LogArgs),
}

/// Version metadata shared by the mutating commands.
#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long, requires = "author")]
    pub address: Option<String>,
}

#[derive(Args)]
pub struct WriteArgs {
    pub object: String,
    pub resource: String,
    /// File holding the content; `-` reads standard input
    pub file: PathBuf,
    #[arg(long, value_enum, default_value = "non-rdf")]
    pub model: ModelArg,
    #[arg(long)]
    pub mime_type: Option<String>,
    #[command(flatten)]
    pub version: VersionArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub object: String,
    pub resource: String,
    #[command(flatten)]
    pub version: VersionArgs,
}

#[derive(Args)]
pub struct ReadArgs {
    pub object: String,
    pub resource: String,
    /// Read as of this version (e.g. `v2`) instead of the head
    #[arg(long = "at")]
    pub at: Option<VersionNum>,
}

#[derive(Args)]
pub struct LogArgs {
    pub object: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}
