//! Majority merge: keep what most annotators agree on.
//!
//! A span, link or parent link survives when a strict majority of versions
//! contain it. Links additionally need both endpoints to survive. The
//! minority opinion is not lost: surviving spans record how many versions
//! missed them, and rejected links between surviving spans are commented on
//! both endpoints.

use super::{build_entities, build_includes, ensure_same_text, Link, MergeConfig, Version};
use crate::clean::clean;
use crate::error::{Error, Result};
use crate::provenance::DiffCollector;
use coref_markup_core::{Markup, Span};
use std::collections::{BTreeMap, BTreeSet};

const MIN_VERSIONS: usize = 3;

fn count<'v, T: Ord + Copy + 'v>(sets: impl Iterator<Item = &'v BTreeSet<T>>) -> BTreeMap<T, usize> {
    let mut counts = BTreeMap::new();
    for set in sets {
        for item in set {
            *counts.entry(*item).or_insert(0) += 1;
        }
    }
    counts
}

/// Merge three or more cleaned versions by strict majority vote.
pub fn merge_majority(versions: &[Markup], config: &MergeConfig, diff: &mut DiffCollector) -> Result<Markup> {
    let n = versions.len();
    if n < MIN_VERSIONS {
        return Err(Error::NotEnoughVersions {
            needed: MIN_VERSIONS,
            got: n,
        });
    }
    ensure_same_text(versions)?;
    for version in versions {
        version.validate()?;
    }
    let views: Vec<Version<'_>> = versions.iter().map(Version::new).collect();
    let is_majority = |k: usize| k * 2 > n;

    let span_counts = count(views.iter().map(|v| &v.spans));
    let spans: BTreeSet<Span> = span_counts
        .iter()
        .filter(|(_, &k)| is_majority(k))
        .map(|(span, _)| *span)
        .collect();
    log::info!("MERGE_MAJORITY: kept {}/{} spans", spans.len(), span_counts.len());
    for (span, &k) in &span_counts {
        if is_majority(k) && k < n {
            diff.add(format!("span missing from {}/{} versions", n - k, n), &[*span]);
        }
    }

    let link_counts = count(views.iter().map(|v| &v.links));
    let mut links: BTreeSet<Link> = BTreeSet::new();
    for (&(source, target), &k) in &link_counts {
        if !(spans.contains(&source) && spans.contains(&target)) {
            continue;
        }
        if is_majority(k) {
            links.insert((source, target));
            continue;
        }
        let Some(view) = views.iter().find(|v| v.links.contains(&(source, target))) else {
            continue;
        };
        log::debug!("MERGE_MAJORITY: rejected {} + {} ({}/{})", view.quote(source), view.quote(target), k, n);
        diff.add(
            format!("rejected link to {} ({}/{} versions)", view.label(target, config.label_max_spans), k, n),
            &[source],
        );
        diff.add(
            format!("rejected link to {} ({}/{} versions)", view.label(source, config.label_max_spans), k, n),
            &[target],
        );
    }
    log::info!("MERGE_MAJORITY: kept {}/{} links", links.len(), link_counts.len());

    let parent_counts = count(views.iter().map(|v| &v.parent_links));
    let parent_links: BTreeSet<Link> = parent_counts
        .iter()
        .filter(|((parent, child), &k)| spans.contains(parent) && spans.contains(child) && is_majority(k))
        .map(|(link, _)| *link)
        .collect();
    log::info!(
        "MERGE_MAJORITY: kept {}/{} parent links",
        parent_links.len(),
        parent_counts.len()
    );

    let linked: BTreeSet<Span> = links.iter().flat_map(|&(s, t)| [s, t]).collect();
    let singletons: BTreeSet<Span> = parent_links
        .iter()
        .flat_map(|&(p, c)| [p, c])
        .filter(|span| !linked.contains(span))
        .collect();

    let entities = build_entities(&links, &singletons);
    let includes = build_includes(&entities, &parent_links);
    Ok(Markup::with_entities(versions[0].text.clone(), entities, includes))
}

/// Full majority pipeline on raw versions: check texts, clean each version,
/// vote, clean the consensus.
pub fn merge_majority_versions(
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
    let mut merged = merge_majority(&versions, config, diff)?;
    clean(&mut merged, diff)?;
    Ok(merged)
}
