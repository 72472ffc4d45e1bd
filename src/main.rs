//! Quorum CLI entry point.

use clap::Parser;

use quorum::cli::{run, Cli, Commands};
use quorum::infrastructure::{init_logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_logging(&config.logging) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Run(args) => run::execute(args, config).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
