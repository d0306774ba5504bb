//! Diff command: report disagreements between two versions

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use super::super::utils::read_markup;
use crate::config::Settings;
use crate::report::MarkupDiff;

/// Print the differences between two versions and their LEA scores
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// First version (A)
    #[arg(value_name = "A")]
    pub a: PathBuf,

    /// Second version (B)
    #[arg(value_name = "B")]
    pub b: PathBuf,

    /// Characters of context around each span
    #[arg(long, value_name = "N")]
    pub context: Option<usize>,
}

/// Run the command.
pub fn run(args: DiffArgs, settings: &Settings) -> Result<(), String> {
    let a = read_markup(&args.a)?;
    let b = read_markup(&args.b)?;
    let mut settings = settings.clone();
    if let Some(context) = args.context {
        settings.context_len = context;
    }
    let diff = MarkupDiff::compute(&a, &b, &settings).map_err(|e| e.to_string())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    diff.render(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| format!("Failed to write to stdout: {}", e))
}
