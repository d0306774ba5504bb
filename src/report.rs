//! Human-readable comparison of two annotations of one text.
//!
//! # Sections
//!
//! ```text
//! Spans in A but not in B ==========   span only one annotator marked
//! Spans in B but not in A ==========
//! Spans belonging to different entities   common span, other chain
//! Children in A but not in B =======   includes link one side lacks
//! Children in B but not in A =======
//! Metrics ==========================   LEA without and with children
//! ```
//!
//! Entities of A are mapped to B by largest span overlap, breaking ties by the
//! smallest minimum span of the candidate. A common span is *mixed* when it
//! is not in the B entity its A entity maps to.
//!
//! The report is read-only: it never cleans or merges its inputs.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::eval::lea::{lea_children_totals, lea_totals, LeaScores};
use coref_markup_core::{CharText, EntityId, Markup, Span};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, Write};

/// A span present in one annotation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// The span
    pub span: Span,
    /// Its text
    pub text: String,
    /// Quoted context with the span marked `>>…<<`
    pub context: String,
    /// Label of its entity
    pub entity: String,
}

/// A common span that sits in differently mapped entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedRecord {
    /// The span
    pub span: Span,
    /// Its text
    pub text: String,
    /// Quoted context
    pub context: String,
    /// Label of its entity in A
    pub entity_a: String,
    /// Label of its entity in B
    pub entity_b: String,
}

/// An includes link one side has and the other lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    /// Label of the including entity
    pub parent: String,
    /// Label of the included entity
    pub child: String,
}

/// Everything the report shows.
#[derive(Debug, Clone)]
pub struct MarkupDiff {
    /// Spans in A but not in B
    pub a_only: Vec<SpanRecord>,
    /// Spans in B but not in A
    pub b_only: Vec<SpanRecord>,
    /// Spans belonging to different entities
    pub mixed: Vec<MixedRecord>,
    /// Children in A but not in B
    pub children_a_only: Vec<ChildRecord>,
    /// Children in B but not in A
    pub children_b_only: Vec<ChildRecord>,
    /// LEA without child spans
    pub lea: LeaScores,
    /// LEA with child spans
    pub lea_children: LeaScores,
    separator_width: usize,
}

/// `<<a//b//c>>`: the longest spans (ties by position), shown in text order.
#[must_use]
pub fn entity_label(spans: &BTreeSet<Span>, text: &CharText<'_>, max_spans: usize) -> String {
    let mut by_length: Vec<Span> = spans.iter().copied().collect();
    by_length.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let mut shown: Vec<Span> = by_length.into_iter().take(max_spans).collect();
    shown.sort();
    let texts: Vec<&str> = shown.iter().map(|s| text.slice(*s)).collect();
    format!("<<{}>>", texts.join("//"))
}

/// Write `\n<message> ====…\n\n` padded to `width` characters.
pub fn write_separator(out: &mut impl Write, message: &str, width: usize) -> io::Result<()> {
    let fill = width.saturating_sub(message.chars().count() + 1);
    writeln!(out, "\n{} {}\n", message, "=".repeat(fill))
}

/// Read-only index over one markup, tolerant of raw input: a span listed
/// by several entities belongs to the last of them, and self-includes and
/// dangling child indices are ignored.
struct Side<'a> {
    entities: Vec<BTreeSet<Span>>,
    includes: Vec<BTreeSet<EntityId>>,
    span_to_entity: HashMap<Span, EntityId>,
    text: CharText<'a>,
}

impl<'a> Side<'a> {
    fn new(markup: &'a Markup) -> Self {
        let entities: Vec<BTreeSet<Span>> =
            markup.entities.iter().map(|spans| spans.iter().copied().collect()).collect();
        let mut span_to_entity = HashMap::new();
        for (id, spans) in entities.iter().enumerate() {
            for span in spans {
                if let Some(previous) = span_to_entity.insert(*span, id) {
                    log::debug!("REPORT: span {} is in entities {} and {}", span, previous, id);
                }
            }
        }
        let includes = (0..entities.len())
            .map(|parent| {
                markup
                    .includes
                    .get(parent)
                    .into_iter()
                    .flatten()
                    .copied()
                    .filter(|&child| child != parent && child < entities.len())
                    .collect()
            })
            .collect();
        Self {
            entities,
            includes,
            span_to_entity,
            text: markup.char_text(),
        }
    }

    fn nodes(&self) -> impl Iterator<Item = (EntityId, &BTreeSet<Span>)> {
        self.entities.iter().enumerate()
    }

    fn spans(&self, id: EntityId) -> Result<&BTreeSet<Span>> {
        self.entities
            .get(id)
            .ok_or_else(|| coref_markup_core::Error::UnknownEntity(id).into())
    }

    fn all_spans(&self) -> BTreeSet<Span> {
        self.span_to_entity.keys().copied().collect()
    }

    /// Spans of every descendant entity that the entity does not own itself.
    fn included_spans(&self, id: EntityId) -> Result<BTreeSet<Span>> {
        let own = self.spans(id)?;
        let mut visited = BTreeSet::from([id]);
        let mut stack: Vec<EntityId> = self.includes[id].iter().copied().collect();
        let mut spans = BTreeSet::new();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            spans.extend(self.entities[next].iter().copied());
            stack.extend(self.includes[next].iter().copied());
        }
        Ok(spans.difference(own).copied().collect())
    }

    fn label(&self, id: EntityId, max_spans: usize) -> Result<String> {
        Ok(entity_label(self.spans(id)?, &self.text, max_spans))
    }

    fn min_span(&self, id: EntityId) -> Option<Span> {
        self.entities.get(id).and_then(|spans| spans.first().copied())
    }

    fn entity_of(&self, span: Span) -> Result<EntityId> {
        self.span_to_entity
            .get(&span)
            .copied()
            .ok_or_else(|| coref_markup_core::Error::UnknownSpan(span).into())
    }
}

/// Map every `from` entity touching a common span to the `to` entity sharing
/// the most spans with it.
fn entity_mapping(from: &Side<'_>, to: &Side<'_>, common: &BTreeSet<Span>) -> Result<BTreeMap<EntityId, EntityId>> {
    let mut mapping = BTreeMap::new();
    for (id, spans) in from.nodes() {
        let mut overlap: BTreeMap<EntityId, usize> = BTreeMap::new();
        for span in spans.iter().filter(|s| common.contains(*s)) {
            *overlap.entry(to.entity_of(*span)?).or_insert(0) += 1;
        }
        let best = overlap
            .into_iter()
            .max_by(|(x, nx), (y, ny)| nx.cmp(ny).then_with(|| to.min_span(*y).cmp(&to.min_span(*x))));
        if let Some((target, _)) = best {
            mapping.insert(id, target);
        }
    }
    Ok(mapping)
}

/// `(child in to, parent in from)` pairs annotated in `from` but not in `to`.
fn missing_children(
    from: &Side<'_>,
    to: &Side<'_>,
    common: &BTreeSet<Span>,
    mapping: &BTreeMap<EntityId, EntityId>,
) -> Result<BTreeSet<(EntityId, EntityId)>> {
    let mut missing = BTreeSet::new();
    for (&from_id, &to_id) in mapping {
        let mut from_children = BTreeSet::new();
        for span in from.included_spans(from_id)?.intersection(common) {
            let child = from.entity_of(*span)?;
            if let Some(&mapped) = mapping.get(&child) {
                from_children.insert(mapped);
            }
        }
        let mut to_children = BTreeSet::new();
        for span in to.included_spans(to_id)?.intersection(common) {
            to_children.insert(to.entity_of(*span)?);
        }
        for child in from_children.difference(&to_children) {
            missing.insert((*child, from_id));
        }
    }
    Ok(missing)
}

impl MarkupDiff {
    /// Compare two annotations of the same text.
    pub fn compute(a: &Markup, b: &Markup, settings: &Settings) -> Result<Self> {
        if !a.same_text(b) {
            return Err(Error::TextMismatch(None));
        }
        let side_a = Side::new(a);
        let side_b = Side::new(b);
        let max = settings.label_max_spans;

        let a_spans = side_a.all_spans();
        let b_spans = side_b.all_spans();
        let common: BTreeSet<Span> = a_spans.intersection(&b_spans).copied().collect();

        let only = |side: &Side<'_>, spans: &BTreeSet<Span>| -> Result<Vec<SpanRecord>> {
            spans
                .iter()
                .filter(|s| !common.contains(*s))
                .map(|&span| {
                    Ok(SpanRecord {
                        span,
                        text: side.text.slice(span).to_string(),
                        context: format!("{:?}", side.text.context(span, settings.context_len)),
                        entity: side.label(side.entity_of(span)?, max)?,
                    })
                })
                .collect()
        };
        let a_only = only(&side_a, &a_spans)?;
        let b_only = only(&side_b, &b_spans)?;

        let mapping_ab = entity_mapping(&side_a, &side_b, &common)?;
        let mut mixed_spans = BTreeSet::new();
        for (&a_id, &b_id) in &mapping_ab {
            let b_entity = side_b.spans(b_id)?;
            mixed_spans.extend(
                side_a
                    .spans(a_id)?
                    .iter()
                    .filter(|s| common.contains(*s) && !b_entity.contains(*s))
                    .copied(),
            );
        }
        let mut mixed = Vec::with_capacity(mixed_spans.len());
        for span in mixed_spans {
            mixed.push(MixedRecord {
                span,
                text: side_a.text.slice(span).to_string(),
                context: format!("{:?}", side_a.text.context(span, settings.context_len)),
                entity_a: side_a.label(side_a.entity_of(span)?, max)?,
                entity_b: side_b.label(side_b.entity_of(span)?, max)?,
            });
        }

        let mapping_ba = entity_mapping(&side_b, &side_a, &common)?;
        let children_a_only = Self::child_records(&side_a, &side_b, &common, &mapping_ab, max)?;
        let children_b_only = Self::child_records(&side_b, &side_a, &common, &mapping_ba, max)?;

        let eps = settings.epsilon;
        Ok(Self {
            a_only,
            b_only,
            mixed,
            children_a_only,
            children_b_only,
            lea: lea_totals(a, b).scores(eps),
            lea_children: lea_children_totals(a, b).scores(eps),
            separator_width: settings.separator_width,
        })
    }

    fn child_records(
        from: &Side<'_>,
        to: &Side<'_>,
        common: &BTreeSet<Span>,
        mapping: &BTreeMap<EntityId, EntityId>,
        max: usize,
    ) -> Result<Vec<ChildRecord>> {
        let mut pairs: Vec<(EntityId, EntityId)> = missing_children(from, to, common, mapping)?.into_iter().collect();
        pairs.sort_by_key(|&(child, parent)| (from.min_span(parent), to.min_span(child)));
        pairs
            .into_iter()
            .map(|(child, parent)| {
                Ok(ChildRecord {
                    parent: from.label(parent, max)?,
                    child: to.label(child, max)?,
                })
            })
            .collect()
    }

    /// True when the two annotations agree on spans, chains and includes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a_only.is_empty()
            && self.b_only.is_empty()
            && self.mixed.is_empty()
            && self.children_a_only.is_empty()
            && self.children_b_only.is_empty()
    }

    /// Write the full report, metrics last.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let width = self.separator_width;
        for (title, records) in [
            ("Spans in A but not in B", &self.a_only),
            ("Spans in B but not in A", &self.b_only),
        ] {
            if records.is_empty() {
                continue;
            }
            write_separator(out, title, width)?;
            for r in records {
                writeln!(out, "Entity:   {}", r.entity)?;
                writeln!(out, "Position: {}", r.span)?;
                writeln!(out, "Text:     {}", r.text)?;
                writeln!(out, "Context:  {}", r.context)?;
                writeln!(out)?;
            }
        }

        if !self.mixed.is_empty() {
            write_separator(out, "Spans belonging to different entities", width)?;
            for r in &self.mixed {
                writeln!(out, "Position:    {}", r.span)?;
                writeln!(out, "Text:        {}", r.text)?;
                writeln!(out, "Context:     {}", r.context)?;
                writeln!(out, "Entity in A: {}", r.entity_a)?;
                writeln!(out, "Entity in B: {}", r.entity_b)?;
                writeln!(out)?;
            }
        }

        for (title, records) in [
            ("Children in A but not in B", &self.children_a_only),
            ("Children in B but not in A", &self.children_b_only),
        ] {
            if records.is_empty() {
                continue;
            }
            write_separator(out, title, width)?;
            for r in records {
                writeln!(out, "Parent: {}", r.parent)?;
                writeln!(out, "Child:  {}", r.child)?;
                writeln!(out)?;
            }
        }

        write_separator(out, "Metrics", width)?;
        writeln!(out, "LEA (w/o child spans): {:.3}", self.lea.f1)?;
        writeln!(out, "LEA (w/  child spans): {:.3}", self.lea_children.f1)?;
        Ok(())
    }
}
