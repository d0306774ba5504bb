//! End-to-end reconciliation scenarios: merge, report and score together.

use coref_markup::eval::{lea, lea_children};
use coref_markup::merge::{get_links, get_parent_links, get_spans};
use coref_markup::{
    clean, merge, merge_majority_versions, merge_versions, DiffCollector, Markup, MarkupDiff, MergeConfig, Settings,
    Span,
};

fn sp(start: usize, end: usize) -> Span {
    Span::new(start, end)
}

// "Ann" at (0, 3) and (10, 13)
const TWO_ANNS: &str = "Ann came. Ann went.";

#[test]
fn split_chain_is_reported_merged_and_scored() {
    let a = Markup::with_entities(TWO_ANNS, vec![vec![sp(0, 3), sp(10, 13)]], vec![]);
    let b = Markup::with_entities(TWO_ANNS, vec![vec![sp(0, 3)], vec![sp(10, 13)]], vec![]);

    let report = MarkupDiff::compute(&a, &b, &Settings::default()).unwrap();
    assert!(report.a_only.is_empty());
    assert!(report.b_only.is_empty());
    assert_eq!(report.mixed.len(), 1);
    assert_eq!(report.mixed[0].span, sp(10, 13));

    let mut diff = DiffCollector::new();
    let merged = merge(&a, &b, &MergeConfig::default(), &mut diff).unwrap();
    assert_eq!(merged.entities, vec![vec![sp(0, 3), sp(10, 13)]]);
    for span in [sp(0, 3), sp(10, 13)] {
        let (regular, _) = diff.comments(span);
        assert_eq!(regular, vec!["added link to «Ann»"]);
    }

    assert!(lea(&a, &b).f1 < 1.0);
    assert!(lea_children(&a, &b).f1 < 1.0);
    assert!(report.lea.f1 < 1.0);
}

const STORY: &str = "Ann met Bob and Cid. She said he was late, so they left.";

fn story(entities: Vec<Vec<Span>>, includes: Vec<Vec<usize>>) -> Markup {
    Markup::with_entities(STORY, entities, includes)
}

// Ann (0,3) Bob (8,11) Cid (16,19) Bob and Cid (8,19) She (21,24) he (30,32) they (46,50)
fn full_story() -> Markup {
    story(
        vec![
            vec![sp(0, 3), sp(21, 24)],
            vec![sp(8, 11), sp(30, 32)],
            vec![sp(8, 19), sp(46, 50)],
            vec![sp(16, 19)],
        ],
        vec![vec![], vec![], vec![1, 3], vec![]],
    )
}

#[test]
fn self_merge_is_silent() {
    let mut expected = full_story();
    clean(&mut expected, &mut DiffCollector::new()).unwrap();

    let mut diff = DiffCollector::new();
    let merged = merge_versions(vec![full_story(), full_story()], &MergeConfig::default(), &mut diff).unwrap();
    assert!(diff.is_empty());
    assert_eq!(get_spans(&merged), get_spans(&expected));
    assert_eq!(get_links(&merged), get_links(&expected));
    assert_eq!(get_parent_links(&merged), get_parent_links(&expected));
}

#[test]
fn merge_is_symmetric_in_its_inputs() {
    let a = full_story();
    let b = story(
        vec![vec![sp(0, 3), sp(30, 32)], vec![sp(8, 11), sp(21, 24)]],
        vec![],
    );
    let ab = merge_versions(vec![a.clone(), b.clone()], &MergeConfig::default(), &mut DiffCollector::new()).unwrap();
    let ba = merge_versions(vec![b, a], &MergeConfig::default(), &mut DiffCollector::new()).unwrap();
    assert_eq!(ab.entities, ba.entities);
    assert_eq!(ab.includes, ba.includes);
}

#[test]
fn merged_output_carries_provenance() {
    let a = full_story();
    let b = story(vec![vec![sp(0, 3), sp(21, 24)], vec![sp(8, 11), sp(30, 32)]], vec![]);
    let mut diff = DiffCollector::new();
    let mut merged = merge_versions(vec![a, b], &MergeConfig::default(), &mut diff).unwrap();
    merged.diff = diff.entries_for(&merged, "; ");

    let json = merged.to_json().unwrap();
    let reread = Markup::from_json(&json).unwrap();
    assert_eq!(reread, merged);

    let they = merged.diff.iter().find(|e| e.span == sp(46, 50)).unwrap();
    assert_eq!(they.comment.as_deref(), Some("added span"));
    let parent = merged.diff.iter().find(|e| e.span == sp(8, 19)).unwrap();
    assert!(parent.comment.as_deref().unwrap().contains("added span"));
}

#[test]
fn majority_pipeline_drops_minority_spans() {
    let a = full_story();
    let b = story(vec![vec![sp(0, 3), sp(21, 24)], vec![sp(8, 11), sp(30, 32)]], vec![]);
    let c = story(vec![vec![sp(0, 3), sp(21, 24), sp(46, 50)]], vec![]);

    let mut diff = DiffCollector::new();
    let merged = merge_majority_versions(vec![a, b, c], &MergeConfig::default(), &mut diff).unwrap();
    assert_eq!(merged.entities, vec![vec![sp(0, 3), sp(21, 24)], vec![sp(8, 11), sp(30, 32)]]);
    assert!(merged.includes.iter().all(Vec::is_empty));
    let (regular, _) = diff.comments(sp(8, 11));
    assert_eq!(regular, vec!["span missing from 1/3 versions"]);
}

#[test]
fn text_mismatch_stops_every_pipeline() {
    let a = full_story();
    let b = Markup::with_entities("Something else entirely, long enough for spans.", vec![], vec![]);
    let mut diff = DiffCollector::new();
    assert!(merge_versions(vec![a.clone(), b.clone()], &MergeConfig::default(), &mut diff)
        .unwrap_err()
        .is_text_mismatch());
    assert!(merge_majority_versions(vec![a.clone(), a.clone(), b.clone()], &MergeConfig::default(), &mut diff)
        .unwrap_err()
        .is_text_mismatch());
    assert!(MarkupDiff::compute(&a, &b, &Settings::default()).unwrap_err().is_text_mismatch());
}
