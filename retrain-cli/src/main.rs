//! Retrain — continuous-delivery trigger for ML projects.
//!
//! # Usage
//!
//! ```text
//! retrain run --before <revision> [--config retrain.yaml] [--json]
//! retrain config [--config retrain.yaml]
//! ```
//!
//! `run` triggers one pipeline sequence: sync the working copy onto the
//! tracked branch, reload the project manifest, rebuild the environment if
//! its declaration changed, and re-run the entry points whose files changed
//! since the given revision. The webhook transport that normally supplies
//! the revision is an external collaborator; this binary is the trigger
//! surface it calls into.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "retrain",
    version,
    about = "Re-run the ML entry points affected by a push",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trigger one pipeline run for a push's before-revision.
    Run(RunArgs),

    /// Parse and print the resolved pipeline config.
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}
