//! facegallery - inspect and edit a face gallery file.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{
    EnrollCommand, InspectCommand, ListCommand, RecognizeCommand, RemoveCommand,
};

/// facegallery - manage enrolled faces.
///
/// Embeddings are produced by an external face model and passed in as
/// JSON arrays of numbers. The gallery file is rewritten atomically on
/// every change.
///
/// Configuration is read from ~/.opensight/facegallery/config.yaml.
#[derive(Parser)]
#[command(name = "facegallery")]
#[command(about = "Face gallery CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.opensight/facegallery/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Gallery file (overrides config)
    #[arg(short = 'd', long, global = true)]
    pub database: Option<String>,

    /// Match threshold (overrides config)
    #[arg(short = 't', long, global = true)]
    pub threshold: Option<f32>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List enrolled names
    List(ListCommand),
    /// Enroll a face embedding under a name
    Enroll(EnrollCommand),
    /// Remove an enrolled name
    Remove(RemoveCommand),
    /// Match an embedding against the gallery
    Recognize(RecognizeCommand),
    /// Show the gallery file header and contents
    Inspect(InspectCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Remove(cmd) => cmd.run(&cli),
        Commands::Recognize(cmd) => cmd.run(&cli),
        Commands::Inspect(cmd) => cmd.run(&cli),
    }
}
