//! Command-line interface for the ingestion daemon.
//!
//! Flags override whatever the optional YAML settings file says.

use clap::Parser;

/// Poll Turkish news feeds on a fixed schedule and store new articles.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a settings YAML file
    #[arg(short, long, env = "NEWSWIRE_CONFIG")]
    pub config: Option<String>,

    /// Path of the JSON-lines article store (overrides `store_path`)
    #[arg(short, long, env = "NEWSWIRE_STORE")]
    pub store: Option<String>,

    /// Run a single ingestion pass and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between scheduled passes (overrides `interval_secs`)
    #[arg(long, env = "NEWSWIRE_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Keep articles in memory only; the store file is never opened
    #[arg(long)]
    pub dry_run: bool,
}
