//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// stepcache - distributed build artifact cache client
///
/// Restores a build step's outputs from the cache registry when its inputs
/// were built before, otherwise runs the step and publishes the result.
#[derive(Parser, Debug)]
#[command(name = "stepcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STEPCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry base URL (overrides registry.url)
    #[arg(long, global = true, env = "STEPCACHE_REGISTRY")]
    pub registry: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore a step's outputs from the cache, or build and publish them
    Build(BuildArgs),

    /// Print the input hash of a step without contacting the registry
    Hash(HashArgs),

    /// Manage the local bloom filter snapshot
    Bloom(BloomArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Step description file (TOML)
    pub step: PathBuf,

    /// Query the registry even if the bloom filter cannot be loaded
    #[arg(long)]
    pub verify_when_unavailable: bool,
}

/// Arguments for the hash command
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Step description file (TOML)
    pub step: PathBuf,
}

/// Arguments for the bloom command
#[derive(Parser, Debug)]
pub struct BloomArgs {
    #[command(subcommand)]
    pub action: BloomAction,
}

/// Bloom filter actions
#[derive(Subcommand, Debug)]
pub enum BloomAction {
    /// Download a fresh filter snapshot from the registry
    Refresh {
        /// Architecture to fetch (defaults to build.arch or the host)
        #[arg(long)]
        arch: Option<String>,
    },

    /// Report whether a step's hash is in the local filter
    Check {
        /// Step description file (TOML)
        step: PathBuf,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
