//! Agreement command: corpus-level LEA-with-children

use clap::Parser;
use std::path::PathBuf;

use super::super::output::write_lines;
use crate::config::Settings;
use crate::eval::{pairs_from_dir, pairs_from_two_dirs, Agreement};

/// Score inter-annotator agreement over a corpus
#[derive(Parser, Debug)]
pub struct AgreementArgs {
    /// One directory holding both annotations, or two parallel directories
    #[arg(required = true, num_args = 1..=2, value_name = "DIR")]
    pub dirs: Vec<PathBuf>,
}

/// Run the command.
pub fn run(args: AgreementArgs, settings: &Settings) -> Result<(), String> {
    let discovery = match args.dirs.as_slice() {
        [dir] => pairs_from_dir(dir),
        [a, b] => pairs_from_two_dirs(a, b),
        _ => return Err("The number of directories cannot exceed two.".to_string()),
    }
    .map_err(|e| e.to_string())?;

    let mut lines = discovery.warnings.clone();
    lines.push(String::new());
    write_lines(&lines)?;

    let agreement = Agreement::score_with(&discovery.pairs, settings.epsilon).map_err(|e| e.to_string())?;
    let mut lines: Vec<String> = agreement
        .documents
        .iter()
        .map(|(name, scores)| format!("{:.3} {}", scores.f1, name))
        .collect();
    lines.push(String::new());
    lines.push(format!("{:.3} Total", agreement.total.f1));
    write_lines(&lines)
}
