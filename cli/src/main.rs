//! Bond CLI
//!
//! Replays scripted scenarios against a bond on a manual clock and prints
//! config hashes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Bond coupon engine command-line interface
#[derive(Parser)]
#[command(name = "bond-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file and print one JSON result per step
    Run {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Stop at the first rejected step
        #[arg(long)]
        fail_fast: bool,

        /// Write the final bond state as a checkpoint
        #[arg(long, env = "BOND_CHECKPOINT_OUT")]
        checkpoint_out: Option<PathBuf>,
    },

    /// Print the SHA-256 hash of a bond config
    HashConfig {
        /// Config file (JSON)
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            fail_fast,
            checkpoint_out,
        } => commands::scenario::run(scenario, fail_fast, checkpoint_out),
        Commands::HashConfig { config } => commands::hash::run(config),
    }
}
