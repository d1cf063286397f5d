//! Doubles: unlisted double-star search CLI
//!
//! Partitions a raw UCAC4 catalog into square-degree buckets, then searches
//! them for common-proper-motion pairs missing from the WDS.

mod cli;
mod info;
mod partition;
mod report;
mod search;

use std::path::Path;

use anyhow::Context;
use celestial_doubles::config::DoublesConfig;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Partition(args) => partition::run(args, &cli),
        Commands::Search(args) => search::run(args, &cli),
        Commands::Info(args) => info::run(args, &cli),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// Defaults, overlaid with a config file when one is given.
fn load_config(path: Option<&Path>) -> anyhow::Result<DoublesConfig> {
    match path {
        Some(path) => DoublesConfig::load(path)
            .with_context(|| format!("Failed to load config file: {:?}", path)),
        None => Ok(DoublesConfig::default()),
    }
}
