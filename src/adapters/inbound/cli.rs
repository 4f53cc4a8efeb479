//! Command-line interface
//!
//! Inbound adapter: turns argv into a `Commands` value for the
//! composition root.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// edge-deploy - zero-downtime rolling restarts behind nginx
#[derive(Parser, Debug)]
#[command(name = "edge-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the deployment descriptor (default: .deploy.yml)
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Restart every instance one at a time, keeping the rest in the pool
    Start {
        /// Arguments forwarded to each instance's start command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Stop every configured instance
    Stop,
    /// Print the current upstream pool as JSON
    Backends,
}
