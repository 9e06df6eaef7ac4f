//! # waymark CLI
//!
//! Command-line interface for waymark - a hierarchical state router with
//! bookmarkable URLs.
//!
//! ## Usage
//!
//! - `waymark go /book/ch2` - Run transitions and print the resulting URL
//! - `waymark sync "/book?_state=..."` - Resolve a URL into router states
//! - `waymark encode '{"page": 3}'` - Encode bookmark data
//! - `waymark decode 0%7B%7D` - Decode a bookmark parameter
//! - `waymark shell` - Interactive navigation session
//! - `waymark tree` - Print the router tree
//!
//! Routers come from a route map file (see `config::route_map`); without one
//! a built-in demo map is used.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{
    decode_command, encode_command, go_command, shell_command, sync_command, tree_command,
};
use config::CliConfigLoader;

/// waymark - A hierarchical, bookmarkable state router
#[derive(Parser)]
#[command(name = "waymark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive a hierarchical state router from the command line")]
#[command(long_about = None)]
struct Cli {
    /// Route map file or directory path
    #[arg(short, long, env = "WAYMARK_CONFIG")]
    config: Option<PathBuf>,

    /// URL adapter override (path, query)
    #[arg(long)]
    adapter: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run transitions in order and print the resulting location
    Go {
        /// Paths of state identifiers, e.g. /book/ch2
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Resolve a URL into the router tree
    Sync {
        /// URL to synchronize with
        url: String,
    },

    /// Encode JSON bookmark data into a URL parameter
    Encode {
        /// JSON document
        json: String,
    },

    /// Decode a bookmark URL parameter into JSON
    Decode {
        /// Parameter value as found in a URL
        param: String,
    },

    /// Start an interactive navigation session
    Shell,

    /// Print the router tree
    Tree {
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> Result<CliConfigLoader> {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(adapter) = &cli.adapter {
        let adapter = adapter
            .parse()
            .map_err(|e| anyhow!("Invalid --adapter value: {e}"))?;
        loader = loader.with_adapter_override(adapter);
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    Ok(loader)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output
    waymark_core::init_tracing(cli.verbose, std::io::stderr)?;

    let config_loader = build_config_loader(&cli)?;

    match cli.command {
        Commands::Go { paths } => go_command(config_loader, paths).await,
        Commands::Sync { url } => sync_command(config_loader, url).await,
        Commands::Encode { json } => encode_command(config_loader, json).await,
        Commands::Decode { param } => decode_command(param).await,
        Commands::Shell => shell_command(config_loader).await,
        Commands::Tree { json } => tree_command(config_loader, json).await,
    }
}
