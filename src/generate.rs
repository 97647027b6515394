//! Static site assembly.
//!
//! Takes the ordered list of resolved entries and writes the proof log.
//!
//! ## Output Structure
//!
//! ```text
//! public/proof/
//! ├── index.html                       # Latest entries + client-side filters
//! ├── index.json                       # Machine-readable feed (optional)
//! ├── proof.css                        # Design tokens + layout rules
//! ├── evidence-sprint_signup_2025-11-02/
//! │   └── index.html                   # Detail page
//! └── ac-green_login-flow_2025-01-05/
//!     └── index.html
//! ```
//!
//! ## Rendering
//!
//! Each page type has a plain view model ([`IndexView`], [`DetailView`]) built
//! from entries, and a pure `render_*` function turning it into
//! [maud](https://maud.lambda.xyz/) markup. Nothing here touches the
//! filesystem except the `write_*` functions at the bottom, so templates are
//! tested without I/O. Maud escapes every interpolated value; the only
//! pre-escaped content is the markdown renderer's output, which escapes its
//! own input.
//!
//! ## CSS and JavaScript
//!
//! Embedded at compile time:
//! - `static/proof.css`: layout rules appended to the design tokens
//! - `static/filter.js`: type/feature filtering on the index page

use crate::config::{self, ProofConfig};
use crate::resolve::{DocumentKind, ProofEntry};
use crate::tag::TagType;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const LAYOUT_CSS: &str = include_str!("../static/proof.css");
const FILTER_JS: &str = include_str!("../static/filter.js");

pub const STYLESHEET_FILE: &str = "proof.css";
pub const INDEX_FILE: &str = "index.html";
pub const FEED_FILE: &str = "index.json";

// ============================================================================
// View models
// ============================================================================

/// One row of the index list.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem<'a> {
    pub tag: &'a str,
    pub tag_type: TagType,
    pub date: &'a str,
    pub feature: &'a str,
    pub feature_label: &'a str,
}

/// Data for the index page: the newest entries and the overall count.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexView<'a> {
    pub items: Vec<IndexItem<'a>>,
    pub total: usize,
}

impl<'a> IndexView<'a> {
    /// Take the first `latest_count` entries (already newest first).
    pub fn new(entries: &'a [ProofEntry], latest_count: usize) -> Self {
        let items = entries
            .iter()
            .take(latest_count)
            .map(|entry| IndexItem {
                tag: &entry.tag,
                tag_type: entry.tag_type,
                date: &entry.date,
                feature: &entry.feature,
                feature_label: &entry.feature_label,
            })
            .collect();
        Self {
            items,
            total: entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body of one document section on a detail page.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody<'a> {
    /// Rendered markdown, already escaped.
    Html(&'a str),
    /// The document was not committed at the tag.
    NotProvided(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView<'a> {
    pub anchor: &'static str,
    pub title: &'static str,
    pub body: SectionBody<'a>,
}

/// Data for one detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView<'a> {
    pub page_title: String,
    pub tag: &'a str,
    pub tag_type: TagType,
    pub badge_label: String,
    pub date: &'a str,
    pub feature_label: &'a str,
    pub commit: &'a str,
    pub demo_url: Option<&'a str>,
    pub missing_files: &'a [String],
    pub sections: Vec<SectionView<'a>>,
}

impl<'a> DetailView<'a> {
    pub fn new(entry: &'a ProofEntry) -> Self {
        let sections = DocumentKind::ALL
            .into_iter()
            .map(|kind| {
                let doc = entry.document(kind);
                let body = if doc.missing {
                    SectionBody::NotProvided(format!(
                        "{} was not provided in this tag.",
                        kind.file_name()
                    ))
                } else {
                    SectionBody::Html(&doc.html)
                };
                SectionView {
                    anchor: kind.anchor(),
                    title: kind.title(),
                    body,
                }
            })
            .collect();

        Self {
            page_title: format!("{} • Proof", entry.tag),
            tag: &entry.tag,
            tag_type: entry.tag_type,
            badge_label: format!("{} · {}", entry.tag_type.label(), entry.tag),
            date: &entry.date,
            feature_label: &entry.feature_label,
            commit: &entry.commit,
            demo_url: entry.demo_url(),
            missing_files: &entry.missing_files,
            sections,
        }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, stylesheet: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(stylesheet);
            }
            body {
                (content)
            }
        }
    }
}

/// Dot + label for each entry type.
fn legend() -> Markup {
    html! {
        div.legend {
            @for tag_type in TagType::ALL {
                span class={ "dot " (tag_type.dot_class()) } aria-hidden="true" {}
                span { (tag_type.label()) }
            }
        }
    }
}

fn filters() -> Markup {
    html! {
        div.filters {
            label {
                "Type"
                select #typeFilter {
                    option value="all" { "All types" }
                    @for tag_type in TagType::ALL {
                        option value=(tag_type.as_str()) { (tag_type.label()) }
                    }
                }
            }
            label {
                "Feature"
                input #featureFilter type="search" placeholder="e.g. signup" autocomplete="off";
            }
        }
    }
}

fn empty_state() -> Markup {
    html! {
        section.empty {
            div.card {
                h2 { "No proof tags yet" }
                p.muted {
                    "Add git tags named "
                    code { "evidence-sprint_*" }
                    " or "
                    code { "ac-green_*" }
                    " with proof markdown to populate this log."
                }
            }
        }
    }
}

fn proof_list(view: &IndexView) -> Markup {
    html! {
        section {
            header.list-head {
                h2 { "Latest " (view.items.len()) " of " (view.total) }
            }
            ul.proof-list {
                @for item in &view.items {
                    li data-type=(item.tag_type.as_str()) data-feature=(item.feature) {
                        span class={ "dot " (item.tag_type.dot_class()) } aria-hidden="true" {}
                        div.entry {
                            a href={ "./" (item.tag) "/index.html" } { (item.tag) }
                            small.muted { (item.date) " • " (item.feature_label) }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the index page: list of latest entries, or the empty state.
pub fn render_index(view: &IndexView) -> Markup {
    let content = html! {
        main {
            header.header {
                h1 { "Proof log" }
                p.lead {
                    "Every entry is a git tag. Acceptance criteria, demo and delta are read from the tagged commit."
                }
                (legend())
                @if !view.is_empty() {
                    (filters())
                }
            }
            @if view.is_empty() {
                (empty_state())
            } @else {
                (proof_list(view))
            }
        }
        @if !view.is_empty() {
            script { (PreEscaped(FILTER_JS)) }
        }
    };

    base_document("Proof log", STYLESHEET_FILE, content)
}

/// Renders one entry's detail page.
pub fn render_detail(view: &DetailView) -> Markup {
    let stylesheet = format!("../{STYLESHEET_FILE}");
    let content = html! {
        main {
            header.header {
                a.back href="../index.html" { "← All proof" }
                span class={ "badge badge-" (view.tag_type.as_str()) } {
                    span aria-hidden="true" { "●" }
                    (view.badge_label)
                }
                h1 { (view.feature_label) }
                p.muted { (view.date) " • " (view.tag_type.label()) }
                @if let Some(url) = view.demo_url {
                    p {
                        a.cta href=(url) target="_blank" rel="noopener noreferrer" {
                            "Watch 90s demo →"
                        }
                    }
                }
                @if !view.missing_files.is_empty() {
                    div.chip-row {
                        @for file in view.missing_files {
                            span.chip.chip-missing { "Missing " (file) }
                        }
                    }
                }
            }
            @for section in &view.sections {
                section.card.stack.prose id=(section.anchor) {
                    h2 { (section.title) }
                    @match &section.body {
                        SectionBody::Html(body) => (PreEscaped(*body)),
                        SectionBody::NotProvided(message) => p.muted { (message) },
                    }
                }
            }
            footer.footer.muted {
                "Tag " code { (view.tag) } " · commit " code { (view.commit) }
                " · "
                a href="../index.html" { "All proof" }
            }
        }
    };

    base_document(&view.page_title, &stylesheet, content)
}

// ============================================================================
// Feed and stylesheet
// ============================================================================

/// `index.json` document.
#[derive(Debug, Serialize)]
pub struct Feed {
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub tag: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub date: String,
    pub feature: String,
    pub feature_label: String,
    pub commit: String,
    pub demo_url: Option<String>,
    pub files: FeedFiles,
}

/// Links to the document sections of a detail page; `null` when missing.
#[derive(Debug, Serialize)]
pub struct FeedFiles {
    #[serde(rename = "AC")]
    pub ac: Option<String>,
    #[serde(rename = "DEMO")]
    pub demo: Option<String>,
    #[serde(rename = "DELTA")]
    pub delta: Option<String>,
}

/// Flatten entries into the feed, keeping their order.
pub fn build_feed(entries: &[ProofEntry], feed_base: &str) -> Feed {
    let base = feed_base.trim_end_matches('/');
    let link = |entry: &ProofEntry, kind: DocumentKind| {
        (!entry.document(kind).missing)
            .then(|| format!("{base}/{}/index.html#{}", entry.tag, kind.anchor()))
    };

    Feed {
        entries: entries
            .iter()
            .map(|entry| FeedEntry {
                tag: entry.tag.clone(),
                tag_type: entry.tag_type,
                date: entry.date.clone(),
                feature: entry.feature.clone(),
                feature_label: entry.feature_label.clone(),
                commit: entry.commit.clone(),
                demo_url: entry.demo.url.clone(),
                files: FeedFiles {
                    ac: link(entry, DocumentKind::Ac),
                    demo: link(entry, DocumentKind::Demo),
                    delta: link(entry, DocumentKind::Delta),
                },
            })
            .collect(),
    }
}

/// Pretty-printed feed with a trailing newline.
pub fn render_feed(feed: &Feed) -> Result<String, serde_json::Error> {
    Ok(format!("{}\n", serde_json::to_string_pretty(feed)?))
}

/// Design tokens followed by the layout rules.
pub fn build_stylesheet(tokens: &str) -> String {
    format!("{tokens}\n{LAYOUT_CSS}")
}

/// Read the shared design tokens, falling back to the configured palette.
pub fn load_tokens(repo_root: &Path, config: &ProofConfig) -> Result<String, GenerateError> {
    let path = repo_root.join(&config.tokens_file);
    if path.is_file() {
        return Ok(fs::read_to_string(&path)?);
    }
    warn!(
        path = %path.display(),
        "design tokens not found, using built-in palette"
    );
    Ok(config::generate_token_css(&config.tokens))
}

// ============================================================================
// Writers
// ============================================================================

pub fn write_stylesheet(out_dir: &Path, tokens: &str) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(STYLESHEET_FILE);
    fs::write(&path, build_stylesheet(tokens))?;
    Ok(path)
}

pub fn write_index(
    out_dir: &Path,
    entries: &[ProofEntry],
    latest_count: usize,
) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(INDEX_FILE);
    let view = IndexView::new(entries, latest_count);
    fs::write(&path, render_index(&view).into_string())?;
    Ok(path)
}

/// Write `<out_dir>/<tag>/index.html`.
pub fn write_detail(out_dir: &Path, entry: &ProofEntry) -> Result<PathBuf, GenerateError> {
    let tag_dir = out_dir.join(&entry.tag);
    fs::create_dir_all(&tag_dir)?;
    let path = tag_dir.join(INDEX_FILE);
    fs::write(&path, render_detail(&DetailView::new(entry)).into_string())?;
    Ok(path)
}

pub fn write_feed(
    out_dir: &Path,
    entries: &[ProofEntry],
    feed_base: &str,
) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(FEED_FILE);
    fs::write(&path, render_feed(&build_feed(entries, feed_base))?)?;
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================
