//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// calsign - your calendar on a message sign
#[derive(Debug, Parser)]
#[command(name = "calsign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALSIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run without a sign: render messages and log them to stdout
    #[arg(long)]
    pub debug: bool,

    /// Render the current message once, print it and exit
    #[arg(long)]
    pub test: bool,

    /// Append log lines to this file instead of stdout
    #[arg(long, env = "CALSIGN_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Path to the PID file
    #[arg(long, env = "CALSIGN_PID_FILE")]
    pub pid_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v')]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Dump,
    /// Check the configuration for errors
    Validate,
    /// Show the configuration file path
    Path,
}
