//! CLI library modules for the coref-markup binary.
//!
//! This module provides the argument parser and the command
//! implementations, so they can be tested without spawning a process.

pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

pub use parser::{Cli, Commands};

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<(), String> {
    let settings = utils::load_settings(cli.config.as_deref())?;
    match cli.command {
        Commands::Merge(args) => commands::merge::run(args, &settings),
        Commands::MergeMajority(args) => commands::majority::run(args, &settings),
        Commands::Diff(args) => commands::diff::run(args, &settings),
        Commands::Agreement(args) => commands::agreement::run(args, &settings),
        Commands::Clean(args) => commands::clean::run(args, &settings),
    }
}
