//! Tag discovery: find proof tags, order them, and resolve them.
//!
//! ```text
//! list tags ─► parse ─┬─► parsed ─► sort (date ↓, tag ↓) ─► limit ─► resolve
//!                     └─► skipped (warned, never published)
//! ```
//!
//! Sorting and limiting finish before any resolution starts, so the limit
//! always keeps the newest tags. Resolution runs on the rayon pool; results
//! come back in sorted order regardless of which tag finishes first.

use crate::resolve::{ProofEntry, resolve_entry};
use crate::tag::{TagInfo, parse_tag};
use crate::vcs::{Vcs, VcsError};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Everything one run learned from history.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    /// Resolved entries, newest first.
    pub entries: Vec<ProofEntry>,
    /// Listed tags that do not follow the naming convention.
    pub skipped: Vec<String>,
}

/// Parsed tags in publication order, plus the names that failed to parse.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub tags: Vec<TagInfo>,
    pub skipped: Vec<String>,
}

/// List tags matching `patterns`, split them into proof tags and skipped
/// names, and sort the proof tags newest first.
pub fn discover_tags(vcs: &dyn Vcs, patterns: &[String]) -> Result<Discovery, VcsError> {
    let mut discovery = Discovery::default();
    for tag in vcs.list_tags(patterns)? {
        match parse_tag(&tag) {
            Some(info) => discovery.tags.push(info),
            None => discovery.skipped.push(tag),
        }
    }
    sort_tags(&mut discovery.tags);
    Ok(discovery)
}

/// Publication order: date descending, then tag name descending.
pub fn compare_tags(a: &TagInfo, b: &TagInfo) -> Ordering {
    b.date.cmp(&a.date).then_with(|| b.tag.cmp(&a.tag))
}

pub fn sort_tags(tags: &mut [TagInfo]) {
    tags.sort_by(compare_tags);
}

/// Keep the first `limit` tags. `None` and `Some(0)` keep everything.
pub fn apply_limit(mut tags: Vec<TagInfo>, limit: Option<usize>) -> Vec<TagInfo> {
    if let Some(limit) = limit.filter(|&n| n > 0) {
        tags.truncate(limit);
    }
    tags
}

/// Parse a user-supplied limit. Anything but a positive integer is ignored
/// with a warning and means "no limit".
pub fn parse_limit(raw: &str) -> Option<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => usize::try_from(n).ok(),
        _ => {
            warn!(value = raw, "ignoring invalid --limit value");
            None
        }
    }
}

/// Resolve tags in parallel, keeping their order. The first error wins.
pub fn resolve_all(
    vcs: &dyn Vcs,
    tags: &[TagInfo],
    proof_dir: &str,
) -> Result<Vec<ProofEntry>, VcsError> {
    tags.par_iter()
        .map(|info| resolve_entry(vcs, info, proof_dir))
        .collect()
}

/// Full discovery: list, parse, sort, limit, then resolve.
pub fn collect_entries(
    vcs: &dyn Vcs,
    patterns: &[String],
    proof_dir: &str,
    limit: Option<usize>,
) -> Result<GenerationResult, VcsError> {
    let Discovery { tags, skipped } = discover_tags(vcs, patterns)?;

    if !skipped.is_empty() {
        warn!(
            count = skipped.len(),
            tags = %skipped.join(", "),
            "skipped malformed proof tags"
        );
    }

    let tags = apply_limit(tags, limit);
    info!(count = tags.len(), "resolving proof tags");
    let entries = resolve_all(vcs, &tags, proof_dir)?;

    Ok(GenerationResult { entries, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeVcs;

    fn patterns() -> Vec<String> {
        vec!["evidence-sprint_*".to_string(), "ac-green_*".to_string()]
    }

    fn tags(names: &[&str]) -> Vec<TagInfo> {
        names.iter().map(|n| parse_tag(n).unwrap()).collect()
    }

    fn names(tags: &[TagInfo]) -> Vec<&str> {
        tags.iter().map(|t| t.tag.as_str()).collect()
    }

    #[test]
    fn sorts_by_date_then_tag_descending() {
        let mut list = tags(&[
            "ac-green_b_2025-02-01",
            "ac-green_a_2025-02-01",
            "ac-green_c_2025-01-01",
        ]);
        sort_tags(&mut list);
        assert_eq!(
            names(&list),
            vec![
                "ac-green_b_2025-02-01",
                "ac-green_a_2025-02-01",
                "ac-green_c_2025-01-01",
            ]
        );
    }

    #[test]
    fn newer_date_wins_over_tag_name() {
        let mut list = tags(&["evidence-sprint_z_2024-12-31", "ac-green_a_2025-01-01"]);
        sort_tags(&mut list);
        assert_eq!(
            names(&list),
            vec!["ac-green_a_2025-01-01", "evidence-sprint_z_2024-12-31"]
        );
    }

    #[test]
    fn limit_keeps_newest() {
        let mut list = tags(&[
            "ac-green_a_2025-01-01",
            "ac-green_b_2025-03-01",
            "ac-green_c_2025-02-01",
        ]);
        sort_tags(&mut list);
        let limited = apply_limit(list, Some(2));
        assert_eq!(
            names(&limited),
            vec!["ac-green_b_2025-03-01", "ac-green_c_2025-02-01"]
        );
    }

    #[test]
    fn zero_or_absent_limit_keeps_everything() {
        let list = tags(&["ac-green_a_2025-01-01", "ac-green_b_2025-03-01"]);
        assert_eq!(apply_limit(list.clone(), None).len(), 2);
        assert_eq!(apply_limit(list.clone(), Some(0)).len(), 2);
        assert_eq!(apply_limit(list, Some(10)).len(), 2);
    }

    #[test]
    fn parse_limit_accepts_positive_integers_only() {
        assert_eq!(parse_limit("5"), Some(5));
        assert_eq!(parse_limit(" 12 "), Some(12));
        assert_eq!(parse_limit("0"), None);
        assert_eq!(parse_limit("-3"), None);
        assert_eq!(parse_limit("ten"), None);
        assert_eq!(parse_limit(""), None);
        assert_eq!(parse_limit("2.5"), None);
    }

    #[test]
    fn discovery_partitions_parsed_and_skipped() {
        let vcs = FakeVcs::new()
            .with_tag("ac-green_login_2025-01-05", "a1")
            .with_tag("ac-green_bad_name_here", "a2")
            .with_tag("evidence-sprint_signup_2025-11-02", "a3");

        let discovery = discover_tags(&vcs, &patterns()).unwrap();

        assert_eq!(
            names(&discovery.tags),
            vec!["evidence-sprint_signup_2025-11-02", "ac-green_login_2025-01-05"]
        );
        assert_eq!(discovery.skipped, vec!["ac-green_bad_name_here"]);
    }

    #[test]
    fn collect_entries_resolves_in_sorted_order() {
        let vcs = FakeVcs::new()
            .with_tag("ac-green_a_2025-01-01", "h1")
            .with_tag("ac-green_b_2025-03-01", "h2")
            .with_tag("ac-green_c_2025-02-01", "h3");

        let result = collect_entries(&vcs, &patterns(), "proof", None).unwrap();

        let tags: Vec<&str> = result.entries.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "ac-green_b_2025-03-01",
                "ac-green_c_2025-02-01",
                "ac-green_a_2025-01-01",
            ]
        );
        let commits: Vec<&str> = result.entries.iter().map(|e| e.commit.as_str()).collect();
        assert_eq!(commits, vec!["h2", "h3", "h1"]);
    }

    #[test]
    fn limit_applies_before_resolution() {
        let vcs = FakeVcs::new()
            .with_tag("ac-green_a_2025-01-01", "h1")
            .with_tag("ac-green_b_2025-03-01", "h2");

        let result = collect_entries(&vcs, &patterns(), "proof", Some(1)).unwrap();

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].tag, "ac-green_b_2025-03-01");
        let calls = vcs.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("ac-green_a_2025-01-01")));
    }

    #[test]
    fn no_tags_is_an_empty_result() {
        let vcs = FakeVcs::new();
        let result = collect_entries(&vcs, &patterns(), "proof", None).unwrap();
        assert!(result.entries.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn resolution_failure_aborts_collection() {
        let vcs = FakeVcs::new()
            .with_tag("ac-green_a_2025-01-01", "h1")
            .with_tag("ac-green_b_2025-03-01", "h2")
            .failing_show("ac-green_a_2025-01-01", "fatal: loose object is corrupt");

        let err = collect_entries(&vcs, &patterns(), "proof", None).unwrap_err();
        assert!(matches!(err, VcsError::Failed { .. }));
    }

    #[test]
    fn tags_outside_patterns_are_not_listed() {
        let vcs = FakeVcs::new()
            .with_tag("release_v1_2025-01-01", "r1")
            .with_tag("ac-green_a_2025-01-01", "h1");

        let result = collect_entries(&vcs, &patterns(), "proof", None).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert!(result.skipped.is_empty());
    }
}
