//! Inter-annotator agreement over a corpus of markup pairs.
//!
//! Documents are paired by name: either two copies of a file somewhere below
//! one directory, or the same relative path below two directories. Each pair
//! is scored with LEA-with-children and the unnormalized sums are added up,
//! so the total is a micro-average weighted by entity sizes.

use super::lea::{lea_children_totals, LeaScores, LeaTotals, EPSILON};
use crate::error::{Error, Result};
use coref_markup_core::Markup;
use glob::glob;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Two annotations of one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentPair {
    /// Name shown in the report
    pub name: String,
    /// First annotation
    pub a: PathBuf,
    /// Second annotation
    pub b: PathBuf,
}

/// Pairs found in a corpus, plus the files that could not be paired.
#[derive(Debug, Clone, Default)]
pub struct PairDiscovery {
    /// Documents to score
    pub pairs: Vec<DocumentPair>,
    /// One message per unpaired or ambiguous document
    pub warnings: Vec<String>,
}

impl PairDiscovery {
    fn warn(&mut self, message: String) {
        log::debug!("AGREEMENT: {}", message);
        self.warnings.push(message);
    }
}

/// Every `*.json` file below `dir`, sorted.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = dir
        .to_str()
        .ok_or_else(|| Error::corpus(format!("Path is not valid UTF-8: {}", dir.display())))?;
    let pattern = format!("{}/**/*.json", glob::Pattern::escape(root));
    let matches = glob(&pattern).map_err(|e| Error::corpus(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
    let mut files = Vec::new();
    for entry in matches {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("glob match error: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Pair files with the same name anywhere below `dir`.
pub fn pairs_from_dir(dir: impl AsRef<Path>) -> Result<PairDiscovery> {
    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in json_files(dir.as_ref())? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        by_name.entry(name).or_default().push(path);
    }

    let mut discovery = PairDiscovery::default();
    for (name, mut paths) in by_name {
        match paths.len() {
            1 => discovery.warn(format!("No matching document for {}", paths[0].display())),
            2 => {
                let b = paths.pop().unwrap_or_default();
                let a = paths.pop().unwrap_or_default();
                discovery.pairs.push(DocumentPair { name, a, b });
            }
            _ => discovery.warn(format!(
                "Too many matching documents: {}",
                paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
            )),
        }
    }
    Ok(discovery)
}

fn relative_paths(dir: &Path) -> Result<BTreeSet<PathBuf>> {
    Ok(json_files(dir)?
        .into_iter()
        .filter_map(|path| path.strip_prefix(dir).ok().map(Path::to_path_buf))
        .collect())
}

/// Pair files with the same relative path below `a` and `b`.
pub fn pairs_from_two_dirs(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<PairDiscovery> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let a_files = relative_paths(a)?;
    let b_files = relative_paths(b)?;

    let mut discovery = PairDiscovery::default();
    for file in a_files.difference(&b_files) {
        discovery.warn(format!("No matching document for {}", a.join(file).display()));
    }
    for file in b_files.difference(&a_files) {
        discovery.warn(format!("No matching document for {}", b.join(file).display()));
    }
    for file in a_files.intersection(&b_files) {
        discovery.pairs.push(DocumentPair {
            name: file.display().to_string(),
            a: a.join(file),
            b: b.join(file),
        });
    }
    Ok(discovery)
}

/// Per-document and corpus scores.
#[derive(Debug, Clone, Default)]
pub struct Agreement {
    /// `(document name, scores)` in pair order
    pub documents: Vec<(String, LeaScores)>,
    /// Micro-averaged scores over all documents
    pub total: LeaScores,
    /// Accumulated sums behind `total`
    pub totals: LeaTotals,
}

impl Agreement {
    /// Score sorted pairs with the default smoothing.
    pub fn score(pairs: &[DocumentPair]) -> Result<Self> {
        Self::score_with(pairs, EPSILON)
    }

    /// Score sorted pairs; any text mismatch aborts the run.
    pub fn score_with(pairs: &[DocumentPair], eps: f64) -> Result<Self> {
        let mut pairs = pairs.to_vec();
        pairs.sort();

        let mut agreement = Agreement::default();
        for pair in &pairs {
            let a = Markup::from_path(&pair.a)?;
            let b = Markup::from_path(&pair.b)?;
            if !a.same_text(&b) {
                return Err(Error::text_mismatch(pair.name.clone()));
            }
            let totals = lea_children_totals(&a, &b);
            let scores = totals.scores(eps);
            log::debug!("{}: p={:.3} r={:.3} f1={:.3}", pair.name, scores.precision, scores.recall, scores.f1);
            agreement.documents.push((pair.name.clone(), scores));
            agreement.totals += totals;
        }
        agreement.total = agreement.totals.scores(eps);
        Ok(agreement)
    }
}
