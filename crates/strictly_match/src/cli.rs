//! Command-line interface for the werewolf binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Werewolf - one human against a table of AI seats
#[derive(Parser, Debug)]
#[command(name = "werewolf")]
#[command(about = "Play werewolf against AI seats from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a match, reading commands from stdin
    Play {
        /// Match file
        #[arg(short, long, default_value = "match.toml")]
        config: PathBuf,

        /// Write every replay record to this JSON lines file
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Seat no human and watch the AI seats play
        #[arg(long)]
        spectate: bool,

        /// Override the seed in the match file
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate a match file and print the table it describes
    CheckConfig {
        /// Match file
        #[arg(short, long, default_value = "match.toml")]
        config: PathBuf,
    },

    /// Send a test prompt to every configured provider
    Probe {
        /// Match file
        #[arg(short, long, default_value = "match.toml")]
        config: PathBuf,
    },
}
