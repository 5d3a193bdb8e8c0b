//! cli
//!
//! Command-line interface layer for Weft.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//!
//! The CLI layer is thin: it parses arguments via clap and dispatches
//! to handlers that drive [`crate::resolve`] through an opened
//! [`crate::workspace::Workspace`].

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = match cli.cwd.clone() {
        Some(cwd) => cwd,
        None => std::env::current_dir()?,
    };
    let ctx = commands::Context {
        cwd,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    match &cli.command {
        Command::Resolve {
            module,
            transitive,
            json,
        } => commands::resolve(&ctx, module, *transitive, *json),
        Command::Providers { module } => commands::providers(&ctx, module),
        Command::Snapshot { module } => commands::snapshot(&ctx, module),
    }
}
