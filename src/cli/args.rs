//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Offcache - offline cache controller
///
/// Seeds a versioned response store, sweeps stale versions, and answers
/// requests cache-first with a network fallback and an offline page.
#[derive(Parser, Debug)]
#[command(name = "offcache")]
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
    #[arg(short, long, global = true, env = "OFFCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a new worker: fetch and store every seed resource
    Install,

    /// Activate the waiting worker and delete stale stores
    Activate(ActivateArgs),

    /// Install, then activate if nothing blocks it
    Register,

    /// Dispatch one request through the active worker
    Fetch(FetchArgs),

    /// Inspect or remove stores
    Stores(StoresArgs),

    /// Show registration and store summary
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the activate command
#[derive(Parser, Debug)]
pub struct ActivateArgs {
    /// Activate even if the worker did not ask to skip waiting
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the worker scope
    pub target: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header (Name: value), repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,

    /// Print the status line and headers before the body
    #[arg(short, long)]
    pub include: bool,
}

/// Arguments for the stores command
#[derive(Parser, Debug)]
pub struct StoresArgs {
    #[command(subcommand)]
    pub action: StoresAction,
}

/// Stores subcommands
#[derive(Subcommand, Debug)]
pub enum StoresAction {
    /// List stores
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the entries of one store
    Show {
        /// Store name
        name: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete one store
    Delete {
        /// Store name
        name: String,
    },

    /// Delete every store
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., worker.store_version)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a header in `Name: value` format
fn parse_header(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find(':')
        .ok_or_else(|| format!("invalid header '{s}': expected 'Name: value'"))?;
    let name = s[..pos].trim();
    if name.is_empty() {
        return Err(format!("invalid header '{s}': empty name"));
    }
    Ok((name.to_string(), s[pos + 1..].trim().to_string()))
}
