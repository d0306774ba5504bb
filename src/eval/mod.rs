//! Agreement metrics between two annotations of the same text.
//!
//! - [`lea`]: LEA and LEA-with-children for one document
//! - [`agreement`]: pairing and micro-averaged scoring over a corpus

pub mod agreement;
pub mod lea;

pub use agreement::{pairs_from_dir, pairs_from_two_dirs, Agreement, DocumentPair, PairDiscovery};
pub use lea::{f1, get_children, lea, lea_children, lea_children_totals, lea_totals, LeaScores, LeaTotals, EPSILON};
