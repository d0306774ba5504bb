//! CLI argument parsing and structure definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{AgreementArgs, CleanArgs, DiffArgs, MajorityArgs, MergeArgs};

/// Reconcile coreference markup from several annotators
#[derive(Parser, Debug)]
#[command(name = "coref-markup")]
#[command(
    author,
    version,
    about = "Reconcile coreference markup from several annotators",
    long_about = r#"
coref-markup - clean, merge, compare and score coreference annotations

Every input is a markup JSON file: a text, its entities (lists of
[start, end] character spans) and the includes relation between entities.

EXAMPLES:
  coref-markup merge ann1/doc.json ann2/doc.json -o merged/doc.json
  coref-markup merge-majority a.json b.json c.json -o consensus.json
  coref-markup diff ann1/doc.json ann2/doc.json
  coref-markup agreement ann1/ ann2/
  coref-markup clean raw.json -o clean.json
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug messages
    #[arg(long, global = true)]
    pub debug: bool,

    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge two or more versions into one consensus markup
    #[command(visible_alias = "m")]
    Merge(MergeArgs),

    /// Merge three versions by majority vote
    MergeMajority(MajorityArgs),

    /// Print the differences between two versions and their LEA scores
    #[command(visible_alias = "d")]
    Diff(DiffArgs),

    /// Score inter-annotator agreement over a corpus
    #[command(visible_alias = "a")]
    Agreement(AgreementArgs),

    /// Clean a single markup file
    Clean(CleanArgs),
}
