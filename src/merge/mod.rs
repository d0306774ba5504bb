//! Merge engine: reconciles independently annotated versions of one text.
//!
//! # Algorithm
//!
//! ```text
//!   A (cleaned) ─┐   spans, links, parent links per version
//!                ├─▶ disagreements → DiffCollector comments
//!   B (cleaned) ─┘   union of links ──▶ union-find ──▶ entities
//!                    union of parent links ─────────▶ includes
//!                                                    ──▶ clean again
//! ```
//!
//! A *link* is an ordered pair of spans of the same entity (every pair from
//! the sorted span list). A *parent link* pairs every span of a parent entity
//! with every span of one of its children. Nothing an annotator marked is
//! silently dropped: the consensus keeps the union and every disagreement is
//! commented on the spans involved.

pub mod majority;

use crate::clean::clean;
use crate::error::{Error, Result};
use crate::provenance::DiffCollector;
use coref_markup_core::{CharText, Markup, Span};
use std::collections::{BTreeSet, HashMap};

pub use majority::{merge_majority, merge_majority_versions};

/// Two spans of one entity, or a parent span and a child span.
pub type Link = (Span, Span);

/// Knobs shared by the merge engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Distinct span texts shown when naming an entity in a comment
    pub label_max_spans: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { label_max_spans: 3 }
    }
}

/// Every span of every entity.
#[must_use]
pub fn get_spans(markup: &Markup) -> BTreeSet<Span> {
    markup.spans()
}

/// All span pairs co-occurring in an entity, each ordered `(smaller, larger)`.
#[must_use]
pub fn get_links(markup: &Markup) -> BTreeSet<Link> {
    let mut links = BTreeSet::new();
    for entity in &markup.entities {
        let mut spans = entity.clone();
        spans.sort();
        for (i, &source) in spans.iter().enumerate() {
            for &target in &spans[i + 1..] {
                links.insert((source, target));
            }
        }
    }
    links
}

/// All `(parent span, child span)` pairs implied by `includes`.
#[must_use]
pub fn get_parent_links(markup: &Markup) -> BTreeSet<Link> {
    let mut links = BTreeSet::new();
    for (parent_idx, children) in markup.includes.iter().enumerate() {
        let Some(parents) = markup.entities.get(parent_idx) else {
            continue;
        };
        for child_spans in children.iter().filter_map(|&c| markup.entities.get(c)) {
            for &parent in parents {
                for &child in child_spans {
                    links.insert((parent, child));
                }
            }
        }
    }
    links
}

/// Spans of one-span entities. After cleaning these only survive because of
/// parent links.
#[must_use]
pub fn get_singletons(markup: &Markup) -> BTreeSet<Span> {
    markup
        .entities
        .iter()
        .filter(|entity| entity.len() == 1)
        .map(|entity| entity[0])
        .collect()
}

/// Fail unless every version annotates the same text.
pub fn ensure_same_text(versions: &[Markup]) -> Result<()> {
    if let Some((first, rest)) = versions.split_first() {
        if let Some(idx) = rest.iter().position(|v| !v.same_text(first)) {
            return Err(Error::text_mismatch(format!("version {} differs from version 0", idx + 1)));
        }
    }
    Ok(())
}

/// Partition spans into entities: connected components of `links`, plus one
/// entity per singleton span that no link touches. Sorted canonically.
#[must_use]
pub fn build_entities(links: &BTreeSet<Link>, singletons: &BTreeSet<Span>) -> Vec<Vec<Span>> {
    let mut index: HashMap<Span, usize> = HashMap::new();
    let mut spans: Vec<Span> = Vec::new();
    for &(source, target) in links {
        for span in [source, target] {
            index.entry(span).or_insert_with(|| {
                spans.push(span);
                spans.len() - 1
            });
        }
    }

    let mut union_find: Vec<usize> = (0..spans.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    fn union(parent: &mut [usize], i: usize, j: usize) {
        let pi = find(parent, i);
        let pj = find(parent, j);
        if pi != pj {
            parent[pj] = pi;
        }
    }

    for (source, target) in links {
        union(&mut union_find, index[source], index[target]);
    }

    let mut clusters: HashMap<usize, Vec<Span>> = HashMap::new();
    for (i, span) in spans.iter().enumerate() {
        let root = find(&mut union_find, i);
        clusters.entry(root).or_default().push(*span);
    }

    let mut entities: Vec<Vec<Span>> = clusters.into_values().collect();
    entities.extend(
        singletons
            .iter()
            .filter(|span| !index.contains_key(*span))
            .map(|span| vec![*span]),
    );
    for entity in &mut entities {
        entity.sort();
    }
    entities.sort();
    entities
}

/// Map parent links onto entity indices.
#[must_use]
pub fn build_includes(entities: &[Vec<Span>], parent_links: &BTreeSet<Link>) -> Vec<Vec<usize>> {
    let span_to_entity: HashMap<Span, usize> = entities
        .iter()
        .enumerate()
        .flat_map(|(idx, entity)| entity.iter().map(move |span| (*span, idx)))
        .collect();
    let mut includes: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); entities.len()];
    for (parent, child) in parent_links {
        match (span_to_entity.get(parent), span_to_entity.get(child)) {
            (Some(&p), Some(&c)) if p == c => {
                log::debug!("MERGE: parent link {} > {} falls inside one entity", parent, child);
            }
            (Some(&p), Some(&c)) => {
                includes[p].insert(c);
            }
            _ => log::warn!("MERGE: parent link {} > {} has no entity", parent, child),
        }
    }
    includes.into_iter().map(|c| c.into_iter().collect()).collect()
}

/// Precomputed view of one version.
pub(crate) struct Version<'a> {
    pub(crate) text: CharText<'a>,
    pub(crate) markup: &'a Markup,
    pub(crate) span_to_entity: HashMap<Span, usize>,
    pub(crate) spans: BTreeSet<Span>,
    pub(crate) links: BTreeSet<Link>,
    pub(crate) parent_links: BTreeSet<Link>,
}

impl<'a> Version<'a> {
    pub(crate) fn new(markup: &'a Markup) -> Self {
        let span_to_entity = markup
            .entities
            .iter()
            .enumerate()
            .flat_map(|(idx, entity)| entity.iter().map(move |span| (*span, idx)))
            .collect();
        Self {
            text: markup.char_text(),
            markup,
            span_to_entity,
            spans: get_spans(markup),
            links: get_links(markup),
            parent_links: get_parent_links(markup),
        }
    }

    /// `«text»//«text»` for the entity owning `span`.
    pub(crate) fn label(&self, span: Span, max_spans: usize) -> String {
        let Some(&idx) = self.span_to_entity.get(&span) else {
            return format!("«{}»", self.text.slice(span));
        };
        let mut texts: Vec<&str> = Vec::new();
        for s in &self.markup.entities[idx] {
            let t = self.text.slice(*s);
            if !texts.contains(&t) {
                texts.push(t);
                if texts.len() == max_spans {
                    break;
                }
            }
        }
        texts.iter().map(|t| format!("«{}»", t)).collect::<Vec<_>>().join("//")
    }

    pub(crate) fn quote(&self, span: Span) -> String {
        format!("«{}» {}", self.text.slice(span), span)
    }
}

/// Merge two cleaned versions into a consensus markup (not yet cleaned).
pub fn merge(a: &Markup, b: &Markup, config: &MergeConfig, diff: &mut DiffCollector) -> Result<Markup> {
    if !a.same_text(b) {
        return Err(Error::TextMismatch(None));
    }
    a.validate()?;
    b.validate()?;
    let va = Version::new(a);
    let vb = Version::new(b);
    let common: BTreeSet<Span> = va.spans.intersection(&vb.spans).copied().collect();

    for (version, other) in [(&va, "B"), (&vb, "A")] {
        for span in version.spans.difference(&common) {
            log::info!("MERGE: {} missing from {}", version.quote(*span), other);
            diff.add("added span", &[*span]);
        }
    }

    for (version, counterpart, other) in [(&va, &vb, "B"), (&vb, &va, "A")] {
        for &(source, target) in version.links.difference(&counterpart.links) {
            if !(common.contains(&source) && common.contains(&target)) {
                continue;
            }
            log::info!(
                "MERGE: {} + {} missing from {}",
                version.quote(source),
                version.quote(target),
                other
            );
            diff.add(
                format!("added link to {}", version.label(target, config.label_max_spans)),
                &[source],
            );
            diff.add(
                format!("added link to {}", version.label(source, config.label_max_spans)),
                &[target],
            );
        }
    }

    for (version, counterpart, other) in [(&va, &vb, "B"), (&vb, &va, "A")] {
        for &(parent, child) in version.parent_links.difference(&counterpart.parent_links) {
            if !(common.contains(&parent) && common.contains(&child)) {
                continue;
            }
            log::info!(
                "MERGE: {} > {} missing from {}",
                version.quote(parent),
                version.quote(child),
                other
            );
            diff.add_shared(
                format!("added child: {}", version.label(child, config.label_max_spans)),
                &[parent],
            );
            diff.add_shared(
                format!("added parent: {}", version.label(parent, config.label_max_spans)),
                &[child],
            );
        }
    }

    let links: BTreeSet<Link> = va.links.union(&vb.links).copied().collect();
    let parent_links: BTreeSet<Link> = va.parent_links.union(&vb.parent_links).copied().collect();
    let singletons: BTreeSet<Span> = get_singletons(a).union(&get_singletons(b)).copied().collect();

    let entities = build_entities(&links, &singletons);
    let includes = build_includes(&entities, &parent_links);
    Ok(Markup::with_entities(a.text.clone(), entities, includes))
}

/// Merge two cleaned versions and clean the result.
pub fn merge_and_clean(
    a: &Markup,
    b: &Markup,
    config: &MergeConfig,
    diff: &mut DiffCollector,
) -> Result<Markup> {
    let mut merged = merge(a, b, config, diff)?;
    clean(&mut merged, diff)?;
    Ok(merged)
}

/// Merge two or more cleaned versions by folding them pairwise, cleaning
/// after every step.
pub fn merge_many(versions: &[Markup], config: &MergeConfig, diff: &mut DiffCollector) -> Result<Markup> {
    let [first, second, rest @ ..] = versions else {
        return Err(Error::NotEnoughVersions {
            needed: 2,
            got: versions.len(),
        });
    };
    ensure_same_text(versions)?;
    let mut merged = merge_and_clean(first, second, config, diff)?;
    for next in rest {
        merged = merge_and_clean(&merged, next, config, diff)?;
    }
    Ok(merged)
}

/// Full merge pipeline on raw versions: check texts, clean each version,
/// merge, clean the consensus.
pub fn merge_versions(
    mut versions: Vec<Markup>,
    config: &MergeConfig,
    diff: &mut DiffCollector,
) -> Result<Markup> {
    ensure_same_text(&versions)?;
    for (idx, version) in versions.iter_mut().enumerate() {
        log::info!("Cleaning version {}", idx);
        clean(version, diff)?;
    }
    log::info!("Merging");
    merge_many(&versions, config, diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    const TEXT: &str = "Ann met Bob. She said he was late.";

    #[test]
    fn dangling_include_is_rejected() {
        let good = Markup::with_entities(TEXT, vec![vec![sp(0, 3), sp(13, 16)]], vec![]);
        let mut bad = good.clone();
        bad.includes = vec![vec![4]];
        assert!(get_parent_links(&bad).is_empty());

        let mut diff = DiffCollector::new();
        let err = merge(&good, &bad, &MergeConfig::default(), &mut diff).unwrap_err();
        assert!(matches!(err, Error::Core(coref_markup_core::Error::InvalidMarkup(_))));
        assert!(diff.is_empty());
    }

    #[test]
    fn links_are_ordered_pairs() {
        let markup = Markup::with_entities(TEXT, vec![vec![sp(13, 16), sp(0, 3), sp(22, 24)]], vec![vec![]]);
        let links = get_links(&markup);
        assert_eq!(
            links,
            BTreeSet::from([(sp(0, 3), sp(13, 16)), (sp(0, 3), sp(22, 24)), (sp(13, 16), sp(22, 24))])
        );
    }

    #[test]
    fn build_entities_closes_links() {
        let links = BTreeSet::from([(sp(0, 1), sp(2, 3)), (sp(4, 5), sp(6, 7)), (sp(2, 3), sp(6, 7))]);
        let singletons = BTreeSet::from([sp(8, 9), sp(0, 1)]);
        let entities = build_entities(&links, &singletons);
        assert_eq!(
            entities,
            vec![vec![sp(0, 1), sp(2, 3), sp(4, 5), sp(6, 7)], vec![sp(8, 9)]]
        );
    }

    #[test]
    fn self_merge_has_no_disagreement() {
        let markup = Markup::with_entities(
            TEXT,
            vec![vec![sp(0, 3), sp(13, 16)], vec![sp(8, 11), sp(22, 24)], vec![sp(0, 11)]],
            vec![vec![], vec![], vec![0, 1]],
        );
        let mut diff = DiffCollector::new();
        let merged = merge_and_clean(&markup, &markup, &MergeConfig::default(), &mut diff).unwrap();
        assert!(diff.is_empty());
        assert_eq!(get_spans(&merged), get_spans(&markup));
        assert_eq!(get_links(&merged), get_links(&markup));
        assert_eq!(get_parent_links(&merged), get_parent_links(&markup));
    }

    #[test]
    fn disagreements_are_commented() {
        let a = Markup::with_entities(TEXT, vec![vec![sp(0, 3), sp(13, 16)]], vec![vec![]]);
        let b = Markup::with_entities(
            TEXT,
            vec![vec![sp(0, 3), sp(8, 11)], vec![sp(13, 16), sp(22, 24)]],
            vec![vec![], vec![]],
        );
        let mut diff = DiffCollector::new();
        let merged = merge(&a, &b, &MergeConfig::default(), &mut diff).unwrap();

        assert_eq!(merged.entities, vec![vec![sp(0, 3), sp(8, 11), sp(13, 16), sp(22, 24)]]);
        assert_eq!(diff.comments(sp(8, 11)).0, vec!["added span"]);
        assert_eq!(diff.comments(sp(22, 24)).0, vec!["added span"]);
        assert_eq!(diff.comments(sp(0, 3)).0, vec!["added link to «Ann»//«She»"]);
        assert_eq!(diff.comments(sp(13, 16)).0, vec!["added link to «Ann»//«She»"]);
        assert!(diff.comments(sp(8, 11)).1.is_empty());
    }

    #[test]
    fn parent_disagreement_is_shared() {
        let entities = vec![vec![sp(0, 3), sp(13, 16)], vec![sp(0, 11)]];
        let a = Markup::with_entities(TEXT, entities.clone(), vec![vec![], vec![0]]);
        let b = Markup::with_entities(TEXT, entities, vec![vec![], vec![]]);
        let mut diff = DiffCollector::new();
        let merged = merge(&a, &b, &MergeConfig::default(), &mut diff).unwrap();
        assert_eq!(merged.includes, vec![vec![], vec![0]]);
        assert_eq!(diff.comments(sp(0, 11)).1, vec!["added child: «Ann»//«She»"]);
        assert_eq!(diff.comments(sp(13, 16)).1, vec!["added parent: «Ann met Bob»"]);
    }

    #[test]
    fn text_mismatch_is_fatal() {
        let a = Markup::new("one");
        let b = Markup::new("two");
        let mut diff = DiffCollector::new();
        let err = merge(&a, &b, &MergeConfig::default(), &mut diff).unwrap_err();
        assert!(err.is_text_mismatch());
        assert!(ensure_same_text(&[a, b]).is_err());
    }

    #[test]
    fn merge_many_folds_all_versions() {
        let a = Markup::with_entities(TEXT, vec![vec![sp(0, 3), sp(13, 16)]], vec![vec![]]);
        let b = Markup::with_entities(TEXT, vec![vec![sp(8, 11), sp(22, 24)]], vec![vec![]]);
        let c = Markup::with_entities(TEXT, vec![vec![sp(0, 3), sp(29, 33)]], vec![vec![]]);
        let mut diff = DiffCollector::new();
        let merged = merge_many(&[a, b, c], &MergeConfig::default(), &mut diff).unwrap();
        assert_eq!(
            merged.entities,
            vec![vec![sp(0, 3), sp(13, 16), sp(29, 33)], vec![sp(8, 11), sp(22, 24)]]
        );
        assert!(matches!(
            merge_many(&[Markup::new(TEXT)], &MergeConfig::default(), &mut diff),
            Err(Error::NotEnoughVersions { needed: 2, got: 1 })
        ));
    }
}
