//! CLI output formatting.
//!
//! Every command has a pure `format_*` function returning lines, and a thin
//! `print_*` wrapper that writes them to stdout. Tests assert on the lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Generated 2 entries in public/proof
//!     proof.css
//!     index.html
//!     evidence-sprint_signup_2025-11-02/index.html
//!     ac-green_login-flow_2025-01-05/index.html  (missing DEMO.md)
//!     index.json
//! Skipped 1 malformed tag
//!     ac-green_bad_name
//! ```
//!
//! ## List
//!
//! ```text
//! 2025-11-02  evidence-sprint  signup
//! 2025-01-05  ac-green         Login-Flow
//! Skipped 1 malformed tag
//!     ac-green_bad_name
//! ```

use crate::discover::Discovery;
use crate::pipeline::BuildSummary;
use crate::tag::TagType;
use std::path::Path;

fn indent(line: impl AsRef<str>) -> String {
    format!("    {}", line.as_ref())
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 { one } else { many }
}

/// Path relative to the output directory, `/`-separated.
fn relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn format_skipped(skipped: &[String]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "Skipped {} malformed {}",
        skipped.len(),
        plural(skipped.len(), "tag", "tags")
    )];
    lines.extend(skipped.iter().map(indent));
    lines
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let count = summary.entry_count();
    let base = summary.out_dir.as_path();
    let mut lines = vec![format!(
        "Generated {count} {} in {}",
        plural(count, "entry", "entries"),
        base.display()
    )];

    lines.push(indent(relative(&summary.stylesheet, base)));
    lines.push(indent(relative(&summary.index, base)));
    for (entry, path) in summary.entries.iter().zip(&summary.details) {
        let page = relative(path, base);
        if entry.missing_files.is_empty() {
            lines.push(indent(page));
        } else {
            lines.push(indent(format!(
                "{page}  (missing {})",
                entry.missing_files.join(", ")
            )));
        }
    }
    if let Some(feed) = &summary.feed {
        lines.push(indent(relative(feed, base)));
    }

    lines.extend(format_skipped(&summary.skipped));
    lines
}

pub fn print_build_summary(summary: &BuildSummary) {
    for line in format_build_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

pub fn format_tag_list(discovery: &Discovery) -> Vec<String> {
    let width = TagType::ALL
        .iter()
        .map(|t| t.as_str().len())
        .max()
        .unwrap_or(0);
    let mut lines: Vec<String> = discovery
        .tags
        .iter()
        .map(|tag| {
            format!(
                "{}  {:<width$}  {}",
                tag.date,
                tag.tag_type.as_str(),
                tag.feature_label
            )
        })
        .collect();
    if lines.is_empty() {
        lines.push("No proof tags found".to_string());
    }
    lines.extend(format_skipped(&discovery.skipped));
    lines
}

pub fn print_tag_list(discovery: &Discovery) {
    for line in format_tag_list(discovery) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
