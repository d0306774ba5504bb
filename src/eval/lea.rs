//! LEA (Link-based Entity-Aware) agreement, with an includes-aware variant.
//!
//! # Definition
//!
//! For every key entity `e` with at least two mentions:
//!
//! ```text
//! importance(e) = |e|
//! resolution(e) = |{(m_i, m_j) in e : same response entity}| / C(|e|, 2)
//! ```
//!
//! Recall is `Σ importance·resolution / Σ importance` over the key; precision
//! is the same with key and response swapped (Moosavi & Strube, 2016).
//!
//! The children variant adds one more component per entity that has
//! children: `importance = |children|` and `resolution` is the fraction of
//! (mention, child span) pairs where some response entity containing the
//! mention also lists the child span among its children. An entity's children
//! are the spans of its direct child entities plus the spans of every leaf
//! entity below them.
//!
//! Sums are kept unnormalized in [`LeaTotals`] so a corpus score is a
//! micro-average over documents.

use coref_markup_core::{Markup, Span};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::AddAssign;

/// Smoothing term of every division.
pub const EPSILON: f64 = 1e-7;

/// `2·P·R / (P + R + ε)`.
#[must_use]
pub fn f1(precision: f64, recall: f64, eps: f64) -> f64 {
    (precision * recall) / (precision + recall + eps) * 2.0
}

/// LEA precision, recall and F1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeaScores {
    /// Precision
    pub precision: f64,
    /// Recall
    pub recall: f64,
    /// F1 score
    pub f1: f64,
}

/// Unnormalized LEA sums.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeaTotals {
    /// Σ importance·resolution over the key
    pub recall_num: f64,
    /// Σ importance over the key
    pub recall_den: f64,
    /// Σ importance·resolution over the response
    pub precision_num: f64,
    /// Σ importance over the response
    pub precision_den: f64,
}

impl LeaTotals {
    /// Normalize with smoothing `eps`.
    #[must_use]
    pub fn scores(&self, eps: f64) -> LeaScores {
        let precision = self.precision_num / (self.precision_den + eps);
        let recall = self.recall_num / (self.recall_den + eps);
        LeaScores {
            precision,
            recall,
            f1: f1(precision, recall, eps),
        }
    }
}

impl AddAssign for LeaTotals {
    fn add_assign(&mut self, other: Self) {
        self.recall_num += other.recall_num;
        self.recall_den += other.recall_den;
        self.precision_num += other.precision_num;
        self.precision_den += other.precision_den;
    }
}

/// Spans of the direct children of entity `idx`, plus spans of every leaf
/// entity reachable below them. Sorted.
#[must_use]
pub fn get_children(markup: &Markup, idx: usize) -> Vec<Span> {
    let includes = |i: usize| markup.includes.get(i).map(Vec::as_slice).unwrap_or(&[]);
    let spans = |i: usize| markup.entities.get(i).map(Vec::as_slice).unwrap_or(&[]);

    let mut children: BTreeSet<Span> = includes(idx).iter().flat_map(|&c| spans(c)).copied().collect();
    let mut visited = HashSet::new();
    let mut stack: Vec<usize> = includes(idx).to_vec();
    while let Some(child) = stack.pop() {
        if !visited.insert(child) {
            continue;
        }
        let grandchildren = includes(child);
        if grandchildren.is_empty() {
            children.extend(spans(child).iter().copied());
        } else {
            stack.extend(grandchildren.iter().filter(|g| !visited.contains(*g)).copied());
        }
    }
    children.into_iter().collect()
}

struct Cluster<'a> {
    spans: &'a [Span],
    children: Vec<Span>,
}

fn clusters(markup: &Markup, with_children: bool) -> Vec<Cluster<'_>> {
    markup
        .entities
        .iter()
        .enumerate()
        .map(|(idx, spans)| Cluster {
            spans,
            children: if with_children { get_children(markup, idx) } else { Vec::new() },
        })
        .collect()
}

/// `(Σ importance·resolution, Σ importance)` of `key` against `response`.
fn one_side(key: &[Cluster<'_>], response: &[Cluster<'_>]) -> (f64, f64) {
    let mention_to_cluster: HashMap<Span, usize> = response
        .iter()
        .enumerate()
        .flat_map(|(idx, c)| c.spans.iter().map(move |s| (*s, idx)))
        .collect();
    let mut child_to_parent_spans: HashMap<Span, HashSet<Span>> = HashMap::new();
    for cluster in response {
        for child in &cluster.children {
            child_to_parent_spans
                .entry(*child)
                .or_default()
                .extend(cluster.spans.iter().copied());
        }
    }

    let mut weighted = 0.0;
    let mut weight = 0.0;
    for entity in key {
        let size = entity.spans.len();
        if size < 2 {
            continue;
        }
        let mut correct = 0usize;
        for (i, a) in entity.spans.iter().enumerate() {
            for b in &entity.spans[i + 1..] {
                if let (Some(x), Some(y)) = (mention_to_cluster.get(a), mention_to_cluster.get(b)) {
                    if x == y {
                        correct += 1;
                    }
                }
            }
        }
        let links = (size * (size - 1) / 2) as f64;
        weighted += size as f64 * (correct as f64 / links);
        weight += size as f64;

        if entity.children.is_empty() {
            continue;
        }
        let mut correct = 0usize;
        for mention in entity.spans {
            for child in &entity.children {
                if child_to_parent_spans.get(child).is_some_and(|p| p.contains(mention)) {
                    correct += 1;
                }
            }
        }
        let n_children = entity.children.len() as f64;
        weighted += n_children * (correct as f64 / (size as f64 * n_children));
        weight += n_children;
    }
    (weighted, weight)
}

fn totals(key: &Markup, response: &Markup, with_children: bool) -> LeaTotals {
    let key = clusters(key, with_children);
    let response = clusters(response, with_children);
    let (recall_num, recall_den) = one_side(&key, &response);
    let (precision_num, precision_den) = one_side(&response, &key);
    LeaTotals {
        recall_num,
        recall_den,
        precision_num,
        precision_den,
    }
}

/// Plain LEA sums, ignoring includes.
#[must_use]
pub fn lea_totals(key: &Markup, response: &Markup) -> LeaTotals {
    totals(key, response, false)
}

/// LEA sums with the children component.
#[must_use]
pub fn lea_children_totals(key: &Markup, response: &Markup) -> LeaTotals {
    totals(key, response, true)
}

/// Plain LEA of one document.
#[must_use]
pub fn lea(key: &Markup, response: &Markup) -> LeaScores {
    lea_totals(key, response).scores(EPSILON)
}

/// LEA with children of one document.
#[must_use]
pub fn lea_children(key: &Markup, response: &Markup) -> LeaScores {
    lea_children_totals(key, response).scores(EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    fn markup(entities: Vec<Vec<Span>>, includes: Vec<Vec<usize>>) -> Markup {
        Markup::with_entities("x".repeat(64), entities, includes)
    }

    #[test]
    fn identical_markups_score_one() {
        let m = markup(
            vec![vec![sp(0, 1), sp(2, 3), sp(4, 5)], vec![sp(6, 7), sp(8, 9)], vec![sp(10, 20)]],
            vec![vec![], vec![], vec![0, 1]],
        );
        assert!((lea(&m, &m).f1 - 1.0).abs() < 1e-6);
        assert!((lea_children(&m, &m).f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn split_entity_lowers_recall_only() {
        let key = markup(vec![vec![sp(0, 1), sp(2, 3), sp(4, 5)]], vec![]);
        let response = markup(vec![vec![sp(0, 1), sp(2, 3)], vec![sp(4, 5)]], vec![]);
        let scores = lea(&key, &response);
        // one of three links found, weighted by 3
        assert!((scores.recall - 1.0 / 3.0).abs() < 1e-6);
        assert!((scores.precision - 1.0).abs() < 1e-6);
        assert!(scores.f1 < 1.0);
    }

    #[test]
    fn swap_exchanges_precision_and_recall() {
        let a = markup(vec![vec![sp(0, 1), sp(2, 3), sp(4, 5)], vec![sp(6, 7), sp(8, 9)]], vec![]);
        let b = markup(vec![vec![sp(0, 1), sp(2, 3)], vec![sp(4, 5), sp(6, 7), sp(8, 9)]], vec![]);
        let ab = lea(&a, &b);
        let ba = lea(&b, &a);
        assert!((ab.precision - ba.recall).abs() < 1e-12);
        assert!((ab.recall - ba.precision).abs() < 1e-12);
        assert!((ab.f1 - ba.f1).abs() < 1e-12);
    }

    #[test]
    fn children_include_leaves_below() {
        let m = markup(
            vec![vec![sp(0, 1)], vec![sp(2, 3)], vec![sp(4, 5)], vec![sp(6, 7)]],
            vec![vec![1], vec![2], vec![], vec![]],
        );
        assert_eq!(get_children(&m, 0), vec![sp(2, 3), sp(4, 5)]);
        assert_eq!(get_children(&m, 1), vec![sp(4, 5)]);
        assert!(get_children(&m, 3).is_empty());
    }

    #[test]
    fn missing_child_lowers_children_score() {
        let entities = vec![vec![sp(0, 1), sp(2, 3)], vec![sp(4, 5), sp(6, 7)]];
        let with_child = markup(entities.clone(), vec![vec![1], vec![]]);
        let without = markup(entities, vec![]);
        assert!((lea(&with_child, &without).f1 - 1.0).abs() < 1e-6);
        let scores = lea_children(&with_child, &without);
        assert!(scores.recall < 1.0);
        assert!((scores.precision - 1.0).abs() < 1e-6);
    }

    #[test]
    fn totals_accumulate() {
        let m = markup(vec![vec![sp(0, 1), sp(2, 3)]], vec![]);
        let mut total = LeaTotals::default();
        total += lea_totals(&m, &m);
        total += lea_totals(&m, &m);
        assert!((total.recall_den - 4.0).abs() < 1e-12);
        assert!((total.scores(EPSILON).f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nothing_to_score_is_zero() {
        let empty = markup(vec![], vec![]);
        assert_eq!(lea(&empty, &empty).f1, 0.0);
    }
}
