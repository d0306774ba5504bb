//! Repair and disagreement comments collected while cleaning and merging.
//!
//! Every automatic change leaves a comment on the span that survived it, so a
//! reviewer opening the consensus markup can see what happened and why. One
//! collector is created per invocation and passed by `&mut` through every
//! `clean`/`merge` call of that invocation; comments on spans that do not
//! survive to the final markup are dropped when the collector is exported.

use coref_markup_core::{DiffEntry, Markup, Span};
use std::collections::{BTreeMap, BTreeSet};

/// Accumulator of per-span comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffCollector {
    comments: BTreeMap<Span, BTreeSet<(String, bool)>>,
}

impl DiffCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a comment to each span.
    pub fn add(&mut self, comment: impl Into<String>, spans: &[Span]) {
        self.insert(comment.into(), spans, false);
    }

    /// Attach a comment shared by both ends of a relation.
    pub fn add_shared(&mut self, comment: impl Into<String>, spans: &[Span]) {
        self.insert(comment.into(), spans, true);
    }

    fn insert(&mut self, comment: String, spans: &[Span], shared: bool) {
        for span in spans {
            self.comments
                .entry(*span)
                .or_default()
                .insert((comment.clone(), shared));
        }
    }

    /// Comments recorded for a span, regular first, each group sorted.
    #[must_use]
    pub fn comments(&self, span: Span) -> (Vec<&str>, Vec<&str>) {
        let mut regular = Vec::new();
        let mut shared = Vec::new();
        if let Some(entries) = self.comments.get(&span) {
            for (comment, is_shared) in entries {
                if *is_shared {
                    shared.push(comment.as_str());
                } else {
                    regular.push(comment.as_str());
                }
            }
        }
        (regular, shared)
    }

    /// Number of spans with at least one comment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.comments.clear();
    }

    /// Diff entries for the spans present in `markup`, sorted by span.
    ///
    /// Comments of one kind are joined with `separator`.
    #[must_use]
    pub fn entries_for(&self, markup: &Markup, separator: &str) -> Vec<DiffEntry> {
        let spans = markup.spans();
        let text = markup.char_text();
        let mut out = Vec::new();
        for span in self.comments.keys() {
            if !spans.contains(span) {
                log::debug!("DIFF: failed to write diff for «{}» {}", text.slice(*span), span);
                continue;
            }
            let (regular, shared) = self.comments(*span);
            out.push(DiffEntry {
                span: *span,
                comment: join(&regular, separator),
                shared_comment: join(&shared, separator),
            });
        }
        out
    }
}

fn join(comments: &[&str], separator: &str) -> Option<String> {
    if comments.is_empty() {
        None
    } else {
        Some(comments.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_sorted_comments_per_kind() {
        let mut diff = DiffCollector::new();
        let span = Span::new(0, 4);
        diff.add("b comment", &[span]);
        diff.add("a comment", &[span]);
        diff.add_shared("added child: «Mary»", &[span]);
        diff.add("a comment", &[span]);

        let markup = Markup::with_entities("John", vec![vec![span]], vec![vec![]]);
        let entries = diff.entries_for(&markup, "; ");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].comment.as_deref(), Some("a comment; b comment"));
        assert_eq!(entries[0].shared_comment.as_deref(), Some("added child: «Mary»"));
    }

    #[test]
    fn skips_spans_missing_from_markup() {
        let mut diff = DiffCollector::new();
        diff.add("deleted duplicate span", &[Span::new(0, 1), Span::new(2, 3)]);
        let markup = Markup::with_entities("abcd", vec![vec![Span::new(2, 3)]], vec![vec![]]);
        let entries = diff.entries_for(&markup, "; ");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].span, Span::new(2, 3));
        assert!(entries[0].shared_comment.is_none());
    }

    #[test]
    fn clear_resets_between_runs() {
        let mut diff = DiffCollector::new();
        diff.add("added span", &[Span::new(0, 1)]);
        assert_eq!(diff.len(), 1);
        diff.clear();
        assert!(diff.is_empty());
    }
}
