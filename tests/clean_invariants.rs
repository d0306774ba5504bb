//! Property tests for the cleaning pipeline.
//!
//! Whatever annotators produce, cleaned markup satisfies the structural
//! invariants the merge engine relies on.

use coref_markup::{clean, DiffCollector, Markup, Span};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const TEXT: &str = "Ann met  Bob. She said he was late, and they left.";

/// Entities of arbitrary spans over `TEXT` (overlapping, adjacent, padded
/// with whitespace, shared between entities) with random includes, self
/// and cyclic ones included.
fn raw_markup() -> impl Strategy<Value = Markup> {
    let len = TEXT.chars().count();
    let span = (0..len).prop_flat_map(move |start| (Just(start), 0..=(len - start).min(12)))
        .prop_map(|(start, l)| Span::new(start, start + l));
    let entities = prop::collection::vec(prop::collection::vec(span, 1..5), 1..6);
    let links = prop::collection::vec((0usize..6, 0usize..6), 0..5);
    (entities, links).prop_map(move |(entities, links)| {
        let mut includes: Vec<Vec<usize>> = vec![Vec::new(); entities.len()];
        for (p, c) in links {
            if p < entities.len() && c < entities.len() && !includes[p].contains(&c) {
                includes[p].push(c);
            }
        }
        Markup::with_entities(TEXT, entities, includes)
    })
}

fn has_link(markup: &Markup, idx: usize) -> bool {
    !markup.includes[idx].is_empty() || markup.includes.iter().any(|children| children.contains(&idx))
}

proptest! {
    #[test]
    fn cleaned_markup_is_well_formed(mut markup in raw_markup()) {
        let mut diff = DiffCollector::new();
        clean(&mut markup, &mut diff).unwrap();
        prop_assert!(markup.validate().is_ok());

        let text: Vec<char> = TEXT.chars().collect();
        let mut owner: HashMap<Span, usize> = HashMap::new();
        for (idx, entity) in markup.entities.iter().enumerate() {
            prop_assert!(entity.len() >= 2 || has_link(&markup, idx), "singleton survived: {:?}", entity);
            prop_assert!(!markup.includes[idx].contains(&idx));

            for (i, a) in entity.iter().enumerate() {
                prop_assert!(a.start < a.end, "empty span {}", a);
                prop_assert!(!text[a.start].is_whitespace(), "leading whitespace in {}", a);
                prop_assert!(!text[a.end - 1].is_whitespace(), "trailing whitespace in {}", a);
                for b in &entity[i + 1..] {
                    prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
                }
                prop_assert!(owner.insert(*a, idx).is_none(), "span {} shared by two entities", a);
            }
        }
    }

    #[test]
    fn comments_only_name_surviving_spans(mut markup in raw_markup()) {
        let mut diff = DiffCollector::new();
        clean(&mut markup, &mut diff).unwrap();
        let spans: BTreeSet<Span> = markup.spans();
        for entry in diff.entries_for(&markup, "; ") {
            prop_assert!(spans.contains(&entry.span));
            prop_assert!(entry.comment.is_some() || entry.shared_comment.is_some());
        }
    }

    #[test]
    fn cleaning_is_a_fixed_point(mut markup in raw_markup()) {
        let mut diff = DiffCollector::new();
        clean(&mut markup, &mut diff).unwrap();
        let once = markup.clone();

        let mut second = DiffCollector::new();
        let stats = clean(&mut markup, &mut second).unwrap();
        prop_assert!(stats.is_clean(), "second pass repaired {:?}", stats);
        prop_assert!(second.is_empty());
        prop_assert_eq!(markup, once);
    }
}

#[test]
fn clean_input_is_untouched() {
    let mut markup = Markup::with_entities(
        TEXT,
        vec![vec![Span::new(0, 3), Span::new(14, 17)], vec![Span::new(9, 12), Span::new(23, 25)]],
        vec![],
    );
    let before = markup.clone();
    let mut diff = DiffCollector::new();
    let stats = clean(&mut markup, &mut diff).unwrap();
    assert!(stats.is_clean());
    assert!(diff.is_empty());
    assert_eq!(markup, before);
}
