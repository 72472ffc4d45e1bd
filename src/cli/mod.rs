//! Command-line interface.

pub mod run;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "quorum",
    about = "Multi-perspective consensus engine",
    version
)]
pub struct Cli {
    /// Path to a config file (defaults to ./quorum.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline for a task and print the synthesized answer
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The problem statement to analyze
    pub task: String,
}
