//! Span/entity graph with parent/child "includes" links.
//!
//! # Layout
//!
//! ```text
//!   span_to_entity            entities (arena, tombstoned)
//!   ┌───────────┬────┐        ┌────┬──────────────────────────────┐
//!   │ (0, 4)    │  0 │ ─────▶ │  0 │ spans {(0,4),(20,22)}        │
//!   │ (20, 22)  │  0 │        │    │ children {1}  parents {}     │
//!   │ (9, 13)   │  1 │ ─────▶ │  1 │ spans {(9,13)}               │
//!   └───────────┴────┘        │    │ children {}   parents {0}    │
//!                             │  2 │ None (merged away)           │
//!                             └────┴──────────────────────────────┘
//! ```
//!
//! Entities refer to each other by index, never by reference, so the graph
//! clones cheaply and has no ownership cycles. Merging is union-find by
//! content: the surviving entity absorbs the spans and the links of the
//! other one, which is tombstoned.

use crate::error::{Error, Result};
use crate::markup::Markup;
use crate::span::Span;
use std::collections::{BTreeSet, HashMap};

/// Index of an entity in an [`EntityGraph`].
pub type EntityId = usize;

/// What an entity may do in the includes relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind {
    /// A plain coreference chain
    #[default]
    Simple,
    /// A multi-entity that groups other entities as its members
    Container,
}

/// Rules for parent/child links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingPolicy {
    /// Any entity may include any other entity except itself.
    #[default]
    Includes,
    /// Only containers have children, containers are never children, and
    /// containers never merge with simple entities.
    MultiEntity,
}

/// One coreference chain and its links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityNode {
    /// Container capability
    pub kind: EntityKind,
    /// Mentions of this entity
    pub spans: BTreeSet<Span>,
    /// Entities included by this one
    pub children: BTreeSet<EntityId>,
    /// Entities including this one
    pub parents: BTreeSet<EntityId>,
}

impl EntityNode {
    fn with_span(span: Span) -> Self {
        Self {
            spans: BTreeSet::from([span]),
            ..Self::default()
        }
    }

    /// Smallest span of the entity.
    #[must_use]
    pub fn min_span(&self) -> Option<Span> {
        self.spans.first().copied()
    }
}

/// Arena of entities keyed by their spans.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    policy: NestingPolicy,
    entities: Vec<Option<EntityNode>>,
    span_to_entity: HashMap<Span, EntityId>,
}

impl EntityGraph {
    /// Create an empty graph using the includes policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with the given nesting policy.
    #[must_use]
    pub fn with_policy(policy: NestingPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a graph from a markup document.
    ///
    /// Under [`NestingPolicy::MultiEntity`], entities with children become
    /// containers before their links are added.
    pub fn from_markup(markup: &Markup, policy: NestingPolicy) -> Result<Self> {
        let mut graph = Self::with_policy(policy);
        let mut ids = Vec::with_capacity(markup.entities.len());
        for (idx, spans) in markup.entities.iter().enumerate() {
            let (first, rest) = spans
                .split_first()
                .ok_or_else(|| Error::invalid_markup(format!("entity {} has no spans", idx)))?;
            let id = graph.add_entity(*first)?;
            for span in rest {
                graph.add_span_to_entity(*span, id)?;
            }
            ids.push(id);
        }
        for (parent_idx, children) in markup.includes.iter().enumerate() {
            let parent = *ids
                .get(parent_idx)
                .ok_or_else(|| Error::invalid_markup(format!("includes row {} has no entity", parent_idx)))?;
            if policy == NestingPolicy::MultiEntity && !children.is_empty() {
                graph.set_kind(parent, EntityKind::Container)?;
            }
            for &child_idx in children {
                let child = *ids
                    .get(child_idx)
                    .ok_or_else(|| Error::invalid_markup(format!("unknown child entity {}", child_idx)))?;
                graph.add_child(parent, child)?;
            }
        }
        Ok(graph)
    }

    /// Export entities sorted by minimum span, with includes renumbered.
    #[must_use]
    pub fn to_markup(&self, text: impl Into<String>) -> Markup {
        let mut live: Vec<(EntityId, &EntityNode)> = self.nodes().collect();
        live.sort_by_key(|(_, node)| node.min_span());

        let new_index: HashMap<EntityId, usize> =
            live.iter().enumerate().map(|(new, (old, _))| (*old, new)).collect();

        let entities = live
            .iter()
            .map(|(_, node)| node.spans.iter().copied().collect())
            .collect();
        let includes = live
            .iter()
            .map(|(_, node)| {
                let mut children: Vec<usize> =
                    node.children.iter().filter_map(|c| new_index.get(c).copied()).collect();
                children.sort_unstable();
                children
            })
            .collect();
        Markup::with_entities(text, entities, includes)
    }

    /// Nesting policy of this graph.
    #[must_use]
    pub fn policy(&self) -> NestingPolicy {
        self.policy
    }

    /// Create a singleton entity for a span that has no entity yet.
    pub fn add_entity(&mut self, span: Span) -> Result<EntityId> {
        if let Some(&entity) = self.span_to_entity.get(&span) {
            return Err(Error::SpanAlreadyAssigned { span, entity });
        }
        let id = self.entities.len();
        self.entities.push(Some(EntityNode::with_span(span)));
        self.span_to_entity.insert(span, id);
        Ok(id)
    }

    /// Entity owning `span`, created as a singleton when absent.
    pub fn get_or_add_entity(&mut self, span: Span) -> EntityId {
        if let Some(&id) = self.span_to_entity.get(&span) {
            return id;
        }
        let id = self.entities.len();
        self.entities.push(Some(EntityNode::with_span(span)));
        self.span_to_entity.insert(span, id);
        id
    }

    /// Add a span to an existing entity.
    pub fn add_span_to_entity(&mut self, span: Span, id: EntityId) -> Result<()> {
        if let Some(&entity) = self.span_to_entity.get(&span) {
            return Err(Error::SpanAlreadyAssigned { span, entity });
        }
        self.node_mut(id)?.spans.insert(span);
        self.span_to_entity.insert(span, id);
        Ok(())
    }

    /// Union the entities of two spans, creating them when needed.
    ///
    /// Returns the surviving entity (the one owning `a`). Merging spans that
    /// already share an entity is an error.
    pub fn merge_spans(&mut self, a: Span, b: Span) -> Result<EntityId> {
        let ea = self.get_or_add_entity(a);
        let eb = self.get_or_add_entity(b);
        if ea == eb {
            return Err(Error::AlreadyMerged(a, b));
        }
        self.merge_entities(ea, eb)?;
        Ok(ea)
    }

    /// Move spans, children and parents of `from` into `into`.
    pub fn merge_entities(&mut self, into: EntityId, from: EntityId) -> Result<()> {
        if into == from {
            return Err(Error::MergeIntoSelf(into));
        }
        if self.policy == NestingPolicy::MultiEntity && self.node(into)?.kind != self.node(from)?.kind {
            return Err(Error::KindMismatch(from, into));
        }
        self.node(into)?;
        let absorbed = self.entities[from].take().ok_or(Error::UnknownEntity(from))?;

        for span in &absorbed.spans {
            self.span_to_entity.insert(*span, into);
        }
        for &child in &absorbed.children {
            if child == into {
                self.node_mut(into)?.parents.remove(&from);
                continue;
            }
            let node = self.node_mut(child)?;
            node.parents.remove(&from);
            node.parents.insert(into);
            self.node_mut(into)?.children.insert(child);
        }
        for &parent in &absorbed.parents {
            if parent == into {
                self.node_mut(into)?.children.remove(&from);
                continue;
            }
            let node = self.node_mut(parent)?;
            node.children.remove(&from);
            node.children.insert(into);
            self.node_mut(into)?.parents.insert(parent);
        }
        self.node_mut(into)?.spans.extend(absorbed.spans);
        Ok(())
    }

    /// Remove a span. Returns the id of the entity if it disappeared with
    /// its last span.
    pub fn delete_span(&mut self, span: Span) -> Result<Option<EntityId>> {
        let id = self.span_to_entity.remove(&span).ok_or(Error::UnknownSpan(span))?;
        let node = self.node_mut(id)?;
        node.spans.remove(&span);
        if node.spans.is_empty() {
            self.delete_entity(id)?;
            return Ok(Some(id));
        }
        Ok(None)
    }

    /// Remove an entity together with its spans and links.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<()> {
        let node = self.entities.get_mut(id).and_then(Option::take).ok_or(Error::UnknownEntity(id))?;
        for span in &node.spans {
            self.span_to_entity.remove(span);
        }
        for parent in node.parents {
            if let Some(p) = self.entities.get_mut(parent).and_then(Option::as_mut) {
                p.children.remove(&id);
            }
        }
        for child in node.children {
            if let Some(c) = self.entities.get_mut(child).and_then(Option::as_mut) {
                c.parents.remove(&id);
            }
        }
        Ok(())
    }

    /// Change the container capability of an entity.
    pub fn set_kind(&mut self, id: EntityId, kind: EntityKind) -> Result<()> {
        let policy = self.policy;
        let node = self.node_mut(id)?;
        if policy == NestingPolicy::MultiEntity {
            if kind == EntityKind::Simple && !node.children.is_empty() {
                return Err(Error::NotAContainer(id, "entity still has members"));
            }
            if kind == EntityKind::Container && !node.parents.is_empty() {
                return Err(Error::NotAContainer(id, "a member cannot become a container"));
            }
        }
        node.kind = kind;
        Ok(())
    }

    /// Link `child` under `parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        if parent == child {
            return Err(Error::SelfParenting(parent));
        }
        if self.policy == NestingPolicy::MultiEntity {
            if self.node(parent)?.kind != EntityKind::Container {
                return Err(Error::NotAContainer(parent, "only containers have members"));
            }
            if self.node(child)?.kind == EntityKind::Container {
                return Err(Error::NotAContainer(child, "a container cannot be a member"));
            }
        }
        self.node(child)?;
        self.node_mut(parent)?.children.insert(child);
        self.node_mut(child)?.parents.insert(parent);
        Ok(())
    }

    /// Unlink `child` from `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        self.node_mut(parent)?.children.remove(&child);
        self.node_mut(child)?.parents.remove(&parent);
        Ok(())
    }

    /// Whether `child` is a direct child of `parent`.
    #[must_use]
    pub fn is_child_of(&self, child: EntityId, parent: EntityId) -> bool {
        self.get(parent).is_some_and(|p| p.children.contains(&child))
    }

    /// Direct children of an entity.
    pub fn children(&self, id: EntityId) -> Result<&BTreeSet<EntityId>> {
        Ok(&self.node(id)?.children)
    }

    /// Direct parents of an entity.
    pub fn parents(&self, id: EntityId) -> Result<&BTreeSet<EntityId>> {
        Ok(&self.node(id)?.parents)
    }

    /// Spans of every descendant entity that the entity does not own itself.
    pub fn included_spans(&self, id: EntityId) -> Result<BTreeSet<Span>> {
        let root = self.node(id)?;
        let mut visited = BTreeSet::from([id]);
        let mut stack: Vec<EntityId> = root.children.iter().copied().collect();
        let mut spans = BTreeSet::new();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            let node = self.node(next)?;
            spans.extend(node.spans.iter().copied());
            stack.extend(node.children.iter().copied());
        }
        Ok(spans.difference(&root.spans).copied().collect())
    }

    /// Entity owning a span.
    #[must_use]
    pub fn entity_of(&self, span: Span) -> Option<EntityId> {
        self.span_to_entity.get(&span).copied()
    }

    /// Whether the span belongs to any entity.
    #[must_use]
    pub fn contains_span(&self, span: Span) -> bool {
        self.span_to_entity.contains_key(&span)
    }

    /// Live entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityNode> {
        self.entities.get(id).and_then(Option::as_ref)
    }

    /// Live entities in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (EntityId, &EntityNode)> {
        self.entities
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_ref().map(|n| (id, n)))
    }

    /// Ids of live entities.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.nodes().map(|(id, _)| id)
    }

    /// Spans owned by an entity.
    pub fn spans(&self, id: EntityId) -> Result<&BTreeSet<Span>> {
        Ok(&self.node(id)?.spans)
    }

    /// Every span in the graph.
    #[must_use]
    pub fn all_spans(&self) -> BTreeSet<Span> {
        self.span_to_entity.keys().copied().collect()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// True when no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.span_to_entity.is_empty()
    }

    fn node(&self, id: EntityId) -> Result<&EntityNode> {
        self.get(id).ok_or(Error::UnknownEntity(id))
    }

    fn node_mut(&mut self, id: EntityId) -> Result<&mut EntityNode> {
        self.entities
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownEntity(id))
    }
}
