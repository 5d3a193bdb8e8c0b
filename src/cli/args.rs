//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! Available on all commands:
//! - `--cwd <path>`: Run as if started in that directory
//! - `--debug`: Enable debug output
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Weft - build orchestration for cross-platform application modules
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if weft was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a module's resolved dependencies
    Resolve {
        /// Module name (defaults to the workspace root)
        #[arg(long)]
        module: Option<String>,

        /// Print the transitive set instead of the direct set
        #[arg(long)]
        transitive: bool,

        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print an executable module's resolved service providers
    Providers {
        /// Module name (defaults to the workspace root)
        #[arg(long)]
        module: Option<String>,
    },

    /// Print a module's export snapshot, regenerated from its sources
    Snapshot {
        /// Module name (defaults to the workspace root)
        #[arg(long)]
        module: Option<String>,
    },
}
