//! # coref-markup
//!
//! Reconcile coreference annotations made independently by several people.
//!
//! - **Cleaning**: repair singletons, overlaps, split spans, whitespace, duplicates
//! - **Merging**: pairwise union with provenance comments, or majority vote
//! - **Diffing**: human-readable report of where two annotators disagree
//! - **Scoring**: LEA and LEA-with-children, per document and over a corpus
//!
//! ## Pipeline
//!
//! ```text
//!   version A ──clean──┐
//!   version B ──clean──┼──▶ merge ──▶ clean ──▶ consensus + diff comments
//!   version C ──clean──┘
//!
//!   version A ─┐
//!              ├──▶ report (spans, chains, includes) + LEA
//!   version B ─┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use coref_markup::{merge_versions, DiffCollector, Markup, MergeConfig, Span};
//!
//! let text = "Ann met Bob. She said he was late.";
//! let a = Markup::with_entities(text, vec![vec![Span::new(0, 3), Span::new(13, 16)]], vec![]);
//! let b = Markup::with_entities(text, vec![vec![Span::new(8, 11), Span::new(22, 24)]], vec![]);
//!
//! let mut diff = DiffCollector::new();
//! let merged = merge_versions(vec![a, b], &MergeConfig::default(), &mut diff).unwrap();
//! assert_eq!(merged.entities.len(), 2);
//! assert!(!diff.is_empty());
//! ```
//!
//! ## Scoring
//!
//! ```rust
//! use coref_markup::{eval::lea_children, Markup, Span};
//!
//! let m = Markup::with_entities("ab cd", vec![vec![Span::new(0, 2), Span::new(3, 5)]], vec![]);
//! assert!((lea_children(&m, &m).f1 - 1.0).abs() < 1e-6);
//! ```

#![warn(missing_docs)]

pub mod clean;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
mod error;
pub mod eval;
pub mod merge;
pub mod provenance;
pub mod report;

pub use clean::{clean, CleanStats};
pub use config::Settings;
pub use error::{Error, Result};
pub use merge::{
    merge, merge_and_clean, merge_many, merge_majority, merge_majority_versions, merge_versions, MergeConfig,
};
pub use provenance::DiffCollector;
pub use report::MarkupDiff;

pub use coref_markup_core::{
    CharText, DiffEntry, EntityGraph, EntityId, EntityKind, EntityNode, Markup, NestingPolicy, Span,
};
