//! Offcache - offline cache controller
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use offcache::cli::{Cli, Commands};
use offcache::config::ConfigManager;
use offcache::error::OffcacheResult;
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

fn init_tracing(verbose: u8, log_format: &str) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("offcache=warn"),
        1 => EnvFilter::new("offcache=info"),
        _ => EnvFilter::new("offcache=debug"),
    };

    // Logs go to stderr so `fetch` output stays clean
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
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
}

async fn run() -> OffcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // An explicit config must exist, except for the config command itself
    let config = match (&cli.command, &cli.config) {
        (Commands::Config(_), _) | (_, None) => config_manager.load().await?,
        (_, Some(_)) => config_manager.load_required().await?,
    };

    init_tracing(cli.verbose, &config.general.log_format);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Install => offcache::cli::commands::install(&config).await,
        Commands::Activate(args) => offcache::cli::commands::activate(args, &config).await,
        Commands::Register => offcache::cli::commands::register(&config).await,
        Commands::Fetch(args) => offcache::cli::commands::fetch(args, &config).await,
        Commands::Stores(args) => offcache::cli::commands::stores(args, &config).await,
        Commands::Status => offcache::cli::commands::status(&config).await,
        Commands::Config(args) => {
            offcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
