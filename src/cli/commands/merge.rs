//! Merge command: pairwise consensus of two or more versions

use clap::Parser;
use std::path::PathBuf;

use super::super::utils::{read_markups, write_with_diff};
use crate::config::Settings;
use crate::merge::merge_versions;
use crate::provenance::DiffCollector;

/// Merge two or more versions into one consensus markup
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Paths to markup versions
    #[arg(required = true, num_args = 2.., value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "PATH")]
    pub out: PathBuf,
}

/// Run the command.
pub fn run(args: MergeArgs, settings: &Settings) -> Result<(), String> {
    let versions = read_markups(&args.paths)?;
    let mut diff = DiffCollector::new();
    let merged = merge_versions(versions, &settings.merge_config(), &mut diff).map_err(|e| e.to_string())?;
    log::info!(
        "Merged {} versions: {} entities, {} commented spans",
        args.paths.len(),
        merged.len(),
        diff.len()
    );
    write_with_diff(merged, &diff, settings, &args.out)
}
