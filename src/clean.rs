//! Cleaning pipeline: repairs common annotation defects in one markup.
//!
//! # Stages
//!
//! ```text
//!   markup ──▶ span arena (per-span parent/child links)
//!          ──▶ 1. remove singletons        one span, no links
//!          ──▶ 2. fix overlapping spans    longest span claims its chars first
//!          ──▶ 3. fix discontinuous spans  [Jo][hn] → [John]
//!          ──▶ 4. strip spans              " John " → "John"
//!          ──▶ 5. remove empty spans       start >= end after stripping
//!          ──▶ 6. deduplicate              span kept by the biggest entity
//!          ──▶ 7. normalize includes       drop links implied by another path
//!          ──▶ 8. remove singletons, sort
//!          ──▶ markup (entities + includes rewritten)
//! ```
//!
//! The order matters: each stage relies on what the previous ones guarantee
//! (stage 3 needs non-overlapping spans, stage 6 runs after stripping can
//! have produced duplicates, stage 8 sees the final links). Every change is logged and commented in the
//! [`DiffCollector`] on the span that survives it.
//!
//! Links are tracked per span rather than per entity while cleaning, because
//! one entity's spans may be split, fused or dropped independently. They are
//! collapsed back into entity-level `includes` at the end.

use crate::error::Result;
use crate::provenance::DiffCollector;
use coref_markup_core::{CharText, Markup, Span};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type NodeId = usize;

/// Spans of one entity, as arena ids.
type EntityInfo = Vec<NodeId>;

/// Counts of repairs made by one [`clean`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Entities dropped for having one span and no links
    pub singletons_removed: usize,
    /// Spans dropped for overlapping a longer span of the same entity
    pub overlapping_removed: usize,
    /// Spans produced by fusing adjacent pieces
    pub discontinuous_fixed: usize,
    /// Spans whose surrounding whitespace was trimmed
    pub spans_stripped: usize,
    /// Spans dropped for being empty
    pub empty_removed: usize,
    /// Spans dropped for duplicating a span of a bigger entity
    pub duplicates_removed: usize,
}

impl CleanStats {
    /// Total number of repairs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.singletons_removed
            + self.overlapping_removed
            + self.discontinuous_fixed
            + self.spans_stripped
            + self.empty_removed
            + self.duplicates_removed
    }

    /// True when nothing had to be repaired.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone)]
struct SpanInfo {
    span: Span,
    parents: BTreeSet<NodeId>,
    children: BTreeSet<NodeId>,
}

/// Span nodes with symmetric parent/child links.
#[derive(Debug, Clone, Default)]
struct SpanArena {
    nodes: Vec<SpanInfo>,
}

impl SpanArena {
    fn push(&mut self, span: Span) -> NodeId {
        self.nodes.push(SpanInfo {
            span,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        });
        self.nodes.len() - 1
    }

    fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        self.nodes[parent].children.insert(child);
        self.nodes[child].parents.insert(parent);
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.remove(&child);
        self.nodes[child].parents.remove(&parent);
    }

    fn has_links(&self, id: NodeId) -> bool {
        !self.nodes[id].parents.is_empty() || !self.nodes[id].children.is_empty()
    }

    /// Detach a node, returning the parents and children it had.
    fn unlink_all(&mut self, id: NodeId) -> (BTreeSet<NodeId>, BTreeSet<NodeId>) {
        let parents = std::mem::take(&mut self.nodes[id].parents);
        let children = std::mem::take(&mut self.nodes[id].children);
        for &p in &parents {
            self.nodes[p].children.remove(&id);
        }
        for &c in &children {
            self.nodes[c].parents.remove(&id);
        }
        (parents, children)
    }

    /// Move every link of `from` onto `into`.
    fn absorb(&mut self, into: NodeId, from: NodeId) {
        let (parents, children) = self.unlink_all(from);
        for p in parents {
            self.link(p, into);
        }
        for c in children {
            self.link(into, c);
        }
    }

    fn is_descendant(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<NodeId> = self.nodes[ancestor].children.iter().copied().collect();
        while let Some(next) = stack.pop() {
            if next == descendant {
                return true;
            }
            if visited.insert(next) {
                stack.extend(self.nodes[next].children.iter().copied());
            }
        }
        false
    }

    /// Direct children that are also reachable through another child.
    fn redundant_children(&self, id: NodeId) -> Vec<NodeId> {
        let children = &self.nodes[id].children;
        children
            .iter()
            .copied()
            .filter(|&child| {
                children
                    .iter()
                    .any(|&other| other != child && self.is_descendant(other, child))
            })
            .collect()
    }
}

struct Cleaner<'a> {
    text: CharText<'a>,
    arena: SpanArena,
    diff: &'a mut DiffCollector,
    stats: CleanStats,
}

/// Repair a markup in place.
///
/// Provenance comments are added to `diff`; stale entries of `markup.diff`
/// whose span no longer exists are dropped.
pub fn clean(markup: &mut Markup, diff: &mut DiffCollector) -> Result<CleanStats> {
    markup.validate()?;

    let (entities, includes, stats) = {
        let mut cleaner = Cleaner {
            text: CharText::new(&markup.text),
            arena: SpanArena::default(),
            diff,
            stats: CleanStats::default(),
        };
        let entities = cleaner.build(markup);
        let entities = cleaner.remove_singletons(entities);
        let entities = cleaner.fix_overlapping_spans(entities);
        let entities = cleaner.fix_discontinuous_spans(entities);
        let entities = cleaner.strip_spans(entities);
        let entities = cleaner.remove_empty_spans(entities);
        let entities = cleaner.deduplicate(entities);
        cleaner.normalize_includes(&entities);
        let entities = cleaner.remove_singletons(entities);
        let entities = cleaner.stabilize(entities);
        let includes = cleaner.collapse_includes(&entities);
        let spans: Vec<Vec<Span>> = entities
            .iter()
            .map(|entity| entity.iter().map(|&n| cleaner.arena.span(n)).collect())
            .collect();
        (spans, includes, cleaner.stats)
    };

    if !stats.is_clean() {
        log::debug!("CLEAN: {:?}", stats);
    }
    markup.entities = entities;
    markup.includes = includes;
    let surviving = markup.spans();
    markup.diff.retain(|entry| surviving.contains(&entry.span));
    Ok(stats)
}

impl Cleaner<'_> {
    fn build(&mut self, markup: &Markup) -> Vec<EntityInfo> {
        let entities: Vec<EntityInfo> = markup
            .entities
            .iter()
            .map(|spans| spans.iter().map(|&s| self.arena.push(s)).collect())
            .collect();
        self.relink(&entities, &markup.includes);
        entities
    }

    /// Replace the links of `entities` by every parent span × child span
    /// pair of `includes`, then drop redundant children.
    fn relink(&mut self, entities: &[EntityInfo], includes: &[Vec<usize>]) {
        for &node in entities.iter().flatten() {
            self.arena.unlink_all(node);
        }
        for (parent_idx, children) in includes.iter().enumerate() {
            for &child_idx in children {
                for &parent in &entities[parent_idx] {
                    for &child in &entities[child_idx] {
                        self.arena.link(parent, child);
                    }
                }
            }
        }
        // decided on the unpruned links, so visiting order does not matter
        let redundant: Vec<(NodeId, NodeId)> = entities
            .iter()
            .flatten()
            .flat_map(|&node| {
                self.arena
                    .redundant_children(node)
                    .into_iter()
                    .map(move |child| (node, child))
            })
            .collect();
        for (parent, child) in redundant {
            self.arena.unlink(parent, child);
        }
    }

    /// Rebuild the links from entity-level includes until nothing changes.
    ///
    /// Duplicate absorption can leave includes implied by another path or
    /// pointing back into their own entity. Afterwards, rebuilding from the
    /// written includes gives the same includes.
    fn normalize_includes(&mut self, entities: &[EntityInfo]) {
        let mut includes = self.collapse_includes(entities);
        loop {
            self.relink(entities, &includes);
            let next = self.collapse_includes(entities);
            if next == includes {
                break;
            }
            log::debug!("CLEAN: dropped redundant includes");
            includes = next;
        }
    }

    fn remove_singletons(&mut self, entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        let mut kept = Vec::with_capacity(entities.len());
        for entity in entities {
            if entity.len() > 1 || entity.iter().any(|&n| self.arena.has_links(n)) {
                kept.push(entity);
            } else if let Some(&node) = entity.first() {
                let span = self.arena.span(node);
                log::info!("CLEAN: deleted singleton «{}» {}", self.text.slice(span), span);
                self.stats.singletons_removed += 1;
            } else {
                log::info!("CLEAN: deleted empty entity");
            }
        }
        kept
    }

    fn fix_overlapping_spans(&mut self, entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        let char_len = self.text.char_len();
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut order = entity;
            order.sort_by_key(|&n| {
                let span = self.arena.span(n);
                (span.start as i64 - span.end as i64, span)
            });

            let mut claimed = vec![false; char_len];
            let mut kept: Vec<NodeId> = Vec::with_capacity(order.len());
            for node in order {
                let span = self.arena.span(node);
                let clashes = (span.start..span.end).any(|i| claimed.get(i).copied().unwrap_or(false));
                if !clashes {
                    for i in span.start..span.end.min(char_len) {
                        claimed[i] = true;
                    }
                    kept.push(node);
                    continue;
                }

                self.arena.unlink_all(node);
                let span_text = self.text.slice(span);
                log::info!("CLEAN: deleted overlapping span «{}» {}", span_text, span);
                self.stats.overlapping_removed += 1;
                let preserved = kept
                    .iter()
                    .map(|&k| self.arena.span(k))
                    .find(|k| k.contains_offset(span.start))
                    .or_else(|| kept.iter().map(|&k| self.arena.span(k)).find(|k| k.overlaps(&span)));
                if let Some(preserved) = preserved {
                    self.diff.add(format!("deleted overlapping «{}»", span_text), &[preserved]);
                }
            }
            out.push(kept);
        }
        out
    }

    /// Assumes the spans of each entity no longer overlap.
    fn fix_discontinuous_spans(&mut self, entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let (empty, mut sorted): (Vec<NodeId>, Vec<NodeId>) =
                entity.into_iter().partition(|&n| self.arena.span(n).is_empty());
            sorted.sort_by_key(|&n| self.arena.span(n));

            let end_to_node: HashMap<usize, NodeId> =
                sorted.iter().map(|&n| (self.arena.span(n).end, n)).collect();
            let mut end_to_start: BTreeMap<usize, usize> = BTreeMap::new();
            let mut chains: BTreeMap<usize, BTreeSet<NodeId>> = BTreeMap::new();

            for &node in &sorted {
                let Span { start, end } = self.arena.span(node);
                if let Some(chain_start) = end_to_start.remove(&start) {
                    end_to_start.insert(end, chain_start);
                    let members = chains.entry(chain_start).or_default();
                    if let Some(&previous) = end_to_node.get(&start) {
                        members.insert(previous);
                    }
                    members.insert(node);
                } else {
                    end_to_start.insert(end, start);
                }
            }

            let mut fixed = empty;
            for (end, start) in end_to_start {
                let Some(members) = chains.remove(&start) else {
                    if let Some(&node) = end_to_node.get(&end) {
                        fixed.push(node);
                    }
                    continue;
                };

                let span = Span::new(start, end);
                log::info!("CLEAN: fixed discontinuous span «{}» {}", self.text.slice(span), span);
                self.diff.add("fixed discontinuous span", &[span]);
                self.stats.discontinuous_fixed += 1;

                let mut parents = BTreeSet::new();
                let mut children = BTreeSet::new();
                for &member in &members {
                    let (p, c) = self.arena.unlink_all(member);
                    parents.extend(p);
                    children.extend(c);
                }
                let fused = self.arena.push(span);
                for parent in parents.difference(&members) {
                    self.arena.link(*parent, fused);
                }
                for child in children.difference(&members) {
                    self.arena.link(fused, *child);
                }
                fixed.push(fused);
            }
            out.push(fixed);
        }
        out
    }

    /// Can produce empty and duplicate spans.
    fn strip_spans(&mut self, entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        for &node in entities.iter().flatten() {
            let span = self.arena.span(node);
            let span_text = self.text.slice(span);
            let leading = span_text.chars().take_while(|c| c.is_whitespace()).count();
            let trailing = span_text.chars().rev().take_while(|c| c.is_whitespace()).count();
            if leading == 0 && trailing == 0 {
                continue;
            }
            let stripped = Span::new(span.start + leading, span.end.saturating_sub(trailing));
            self.arena.nodes[node].span = stripped;
            log::info!(
                "CLEAN: «{}» {} -> «{}» {}",
                span_text,
                span,
                self.text.slice(stripped),
                stripped
            );
            self.diff.add(format!("stripped from «{}»", span_text), &[stripped]);
            self.stats.spans_stripped += 1;
        }
        entities
    }

    fn remove_empty_spans(&mut self, entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let before = entity.len();
            let mut non_empty = Vec::with_capacity(before);
            for node in entity {
                if self.arena.span(node).is_empty() {
                    self.arena.unlink_all(node);
                } else {
                    non_empty.push(node);
                }
            }
            if non_empty.len() != before {
                log::info!("CLEAN: deleted {} empty spans", before - non_empty.len());
                self.stats.empty_removed += before - non_empty.len();
            }
            out.push(non_empty);
        }
        out
    }

    /// On conflict the span stays with the entity that has the most spans.
    fn deduplicate(&mut self, mut entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        entities.sort_by_key(|entity| Reverse(entity.len()));
        let mut seen: HashMap<Span, NodeId> = HashMap::new();
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut spans = Vec::with_capacity(entity.len());
            for node in entity {
                let span = self.arena.span(node);
                match seen.get(&span) {
                    None => {
                        seen.insert(span, node);
                        spans.push(node);
                    }
                    Some(&survivor) => {
                        log::info!("CLEAN: deleted duplicate span «{}» {}", self.text.slice(span), span);
                        self.diff.add("deleted duplicate span", &[span]);
                        self.stats.duplicates_removed += 1;
                        self.arena.absorb(survivor, node);
                    }
                }
            }
            out.push(spans);
        }
        out
    }

    fn stabilize(&self, mut entities: Vec<EntityInfo>) -> Vec<EntityInfo> {
        for entity in &mut entities {
            entity.sort_by_key(|&n| self.arena.span(n));
        }
        entities.sort_by_cached_key(|entity| entity.iter().map(|&n| self.arena.span(n)).collect::<Vec<_>>());
        entities
    }

    fn collapse_includes(&self, entities: &[EntityInfo]) -> Vec<Vec<usize>> {
        let mut node_to_entity: HashMap<NodeId, usize> = HashMap::new();
        for (idx, entity) in entities.iter().enumerate() {
            for &node in entity {
                node_to_entity.insert(node, idx);
            }
        }
        entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| {
                let mut children = BTreeSet::new();
                for &parent in entity {
                    for &child in &self.arena.nodes[parent].children {
                        match node_to_entity.get(&child) {
                            Some(&child_idx) if child_idx == idx => {
                                log::debug!(
                                    "CLEAN: ignored self-include of entity with «{}»",
                                    self.text.slice(self.arena.span(parent))
                                );
                            }
                            Some(&child_idx) => {
                                children.insert(child_idx);
                            }
                            None => log::warn!(
                                "CLEAN: child span {} of {} is not in any entity",
                                self.arena.span(child),
                                self.arena.span(parent)
                            ),
                        }
                    }
                }
                children.into_iter().collect()
            })
            .collect()
    }
}
