//! Merge-majority command: keep what two of three annotators agree on

use clap::Parser;
use std::path::PathBuf;

use super::super::utils::{read_markups, write_with_diff};
use crate::config::Settings;
use crate::merge::merge_majority_versions;
use crate::provenance::DiffCollector;

/// Merge three versions by majority vote
#[derive(Parser, Debug)]
pub struct MajorityArgs {
    /// Paths to markup versions
    #[arg(required = true, num_args = 3, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "PATH")]
    pub out: PathBuf,
}

/// Run the command.
pub fn run(args: MajorityArgs, settings: &Settings) -> Result<(), String> {
    let versions = read_markups(&args.paths)?;
    let mut diff = DiffCollector::new();
    let merged =
        merge_majority_versions(versions, &settings.merge_config(), &mut diff).map_err(|e| e.to_string())?;
    write_with_diff(merged, &diff, settings, &args.out)
}
