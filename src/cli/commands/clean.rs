//! Clean command: repair one markup file

use clap::Parser;
use std::path::PathBuf;

use super::super::utils::{read_markup, write_with_diff};
use crate::clean::clean;
use crate::config::Settings;
use crate::provenance::DiffCollector;

/// Clean a single markup file
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Markup to clean
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "PATH")]
    pub out: PathBuf,
}

/// Run the command.
pub fn run(args: CleanArgs, settings: &Settings) -> Result<(), String> {
    let mut markup = read_markup(&args.input)?;
    let mut diff = DiffCollector::new();
    let stats = clean(&mut markup, &mut diff).map_err(|e| e.to_string())?;
    if stats.is_clean() {
        log::info!("{}: nothing to repair", args.input.display());
    } else {
        log::info!("{}: {} repairs ({:?})", args.input.display(), stats.total(), stats);
    }
    write_with_diff(markup, &diff, settings, &args.out)
}
