//! stepcache - distributed build artifact cache client
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use stepcache::cli::{Cli, Commands};
use stepcache::config::ConfigManager;
use stepcache::error::StepCacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StepCacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;

    // 0 = warn (bloom fallbacks still show), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("stepcache=warn"),
        1 => EnvFilter::new("stepcache=info"),
        _ => EnvFilter::new("stepcache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    debug!("Using config {}", config_manager.path().display());

    if let Some(url) = cli.registry {
        debug!("Registry overridden on the command line: {}", url);
        config.registry.url = url;
    }

    match cli.command {
        Commands::Build(args) => stepcache::cli::commands::build(args, &config).await,
        Commands::Hash(args) => stepcache::cli::commands::hash(args, &config).await,
        Commands::Bloom(args) => stepcache::cli::commands::bloom(args, &config).await,
        Commands::Config(args) => {
            stepcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
