//! Proof resolution: turn a parsed tag into a publishable [`ProofEntry`].
//!
//! For each tag the resolver reads the three proof documents *as committed at
//! that tag* (never from the working tree), renders the ones that exist, and
//! records the short commit hash the tag points at.
//!
//! A document that was never committed at the tag is expected and becomes a
//! `missing` [`ProofDocument`]. A failure to resolve the commit hash is not:
//! the tag was listed moments ago, so it vanishing means history moved under
//! us and the whole run must fail rather than publish a partial entry.

use crate::markdown::{extract_first_url, markdown_to_html};
use crate::tag::{TagInfo, TagType};
use crate::vcs::{Vcs, VcsError};

/// The three proof documents every tag may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Ac,
    Demo,
    Delta,
}

impl DocumentKind {
    /// Fixed order used for `missing_files`, page sections and the feed.
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Ac, DocumentKind::Demo, DocumentKind::Delta];

    /// File name inside the proof directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Ac => "AC.md",
            DocumentKind::Demo => "DEMO.md",
            DocumentKind::Delta => "DELTA.md",
        }
    }

    /// Key used in the JSON feed's `files` object.
    pub fn key(self) -> &'static str {
        match self {
            DocumentKind::Ac => "AC",
            DocumentKind::Demo => "DEMO",
            DocumentKind::Delta => "DELTA",
        }
    }

    /// Element id of the document's section on the detail page.
    pub fn anchor(self) -> &'static str {
        match self {
            DocumentKind::Ac => "ac",
            DocumentKind::Demo => "demo",
            DocumentKind::Delta => "delta",
        }
    }

    /// Section heading on the detail page.
    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Ac => "Acceptance criteria",
            DocumentKind::Demo => "Demo",
            DocumentKind::Delta => "Delta",
        }
    }
}

/// One proof document resolved at a tag.
///
/// `missing` holds exactly when `markdown` is `None`, and a missing document
/// always has empty `html`. Construct through [`ProofDocument::from_markdown`]
/// to keep that true.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofDocument {
    pub kind: DocumentKind,
    pub markdown: Option<String>,
    pub html: String,
    pub missing: bool,
    /// First absolute URL in the markdown. Only extracted for `DEMO.md`.
    pub url: Option<String>,
}

impl ProofDocument {
    /// Build a document from raw committed content.
    ///
    /// Blank content counts as absent: it would render to nothing, and a
    /// present document with no HTML would break the missing invariant.
    pub fn from_markdown(kind: DocumentKind, markdown: Option<String>) -> Self {
        let markdown = markdown.filter(|text| !text.trim().is_empty());
        let html = markdown.as_deref().map(markdown_to_html).unwrap_or_default();
        let url = match kind {
            DocumentKind::Demo => markdown.as_deref().and_then(extract_first_url),
            _ => None,
        };
        Self {
            kind,
            missing: markdown.is_none(),
            markdown,
            html,
            url,
        }
    }
}

/// The unit of publication: one resolved proof tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofEntry {
    pub tag: String,
    pub tag_type: TagType,
    pub feature: String,
    pub feature_label: String,
    pub date: String,
    /// Short hash the tag resolved to during this run.
    pub commit: String,
    pub ac: ProofDocument,
    pub demo: ProofDocument,
    pub delta: ProofDocument,
    /// File names of missing documents, in `AC.md`, `DEMO.md`, `DELTA.md` order.
    pub missing_files: Vec<String>,
}

impl ProofEntry {
    /// Assemble an entry from a parsed tag and its resolved documents.
    pub fn new(
        info: &TagInfo,
        commit: String,
        ac: ProofDocument,
        demo: ProofDocument,
        delta: ProofDocument,
    ) -> Self {
        let missing_files = [&ac, &demo, &delta]
            .into_iter()
            .filter(|doc| doc.missing)
            .map(|doc| doc.kind.file_name().to_string())
            .collect();
        Self {
            tag: info.tag.clone(),
            tag_type: info.tag_type,
            feature: info.feature.clone(),
            feature_label: info.feature_label.clone(),
            date: info.date.clone(),
            commit,
            ac,
            demo,
            delta,
            missing_files,
        }
    }

    pub fn document(&self, kind: DocumentKind) -> &ProofDocument {
        match kind {
            DocumentKind::Ac => &self.ac,
            DocumentKind::Demo => &self.demo,
            DocumentKind::Delta => &self.delta,
        }
    }

    /// Demo link, when `DEMO.md` contains one.
    pub fn demo_url(&self) -> Option<&str> {
        self.demo.url.as_deref()
    }
}

/// Path of a proof document inside the tagged tree, always `/`-separated.
pub fn document_path(proof_dir: &str, kind: DocumentKind) -> String {
    let dir = proof_dir.trim_matches('/');
    if dir.is_empty() {
        kind.file_name().to_string()
    } else {
        format!("{dir}/{}", kind.file_name())
    }
}

/// Resolve one tag against version control.
///
/// Reads `AC.md`, `DEMO.md` and `DELTA.md` from `proof_dir` at the tag, then
/// the tag's short hash. Any [`VcsError`] aborts the entry.
pub fn resolve_entry(
    vcs: &dyn Vcs,
    info: &TagInfo,
    proof_dir: &str,
) -> Result<ProofEntry, VcsError> {
    let read = |kind: DocumentKind| -> Result<ProofDocument, VcsError> {
        let content = vcs.show_file(&info.tag, &document_path(proof_dir, kind))?;
        Ok(ProofDocument::from_markdown(kind, content))
    };
    let ac = read(DocumentKind::Ac)?;
    let demo = read(DocumentKind::Demo)?;
    let delta = read(DocumentKind::Delta)?;

    let commit = vcs.short_hash(&info.tag)?;

    Ok(ProofEntry::new(info, commit, ac, demo, delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::parse_tag;
    use crate::test_helpers::FakeVcs;

    const TAG: &str = "evidence-sprint_signup_2025-11-02";

    fn info() -> TagInfo {
        parse_tag(TAG).unwrap()
    }

    fn assert_invariant(doc: &ProofDocument) {
        assert_eq!(doc.missing, doc.markdown.is_none());
        if doc.missing {
            assert_eq!(doc.html, "");
        } else {
            assert!(!doc.html.is_empty());
        }
    }

    #[test]
    fn document_path_joins_with_forward_slash() {
        assert_eq!(document_path("proof", DocumentKind::Ac), "proof/AC.md");
        assert_eq!(document_path("proof/", DocumentKind::Demo), "proof/DEMO.md");
        assert_eq!(document_path("", DocumentKind::Delta), "DELTA.md");
    }

    #[test]
    fn resolves_all_three_documents() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file(TAG, "proof/AC.md", "# AC\n- signup works")
            .with_file(TAG, "proof/DEMO.md", "Watch https://demo.test/signup")
            .with_file(TAG, "proof/DELTA.md", "Added **signup**");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();

        assert_eq!(entry.tag, TAG);
        assert_eq!(entry.tag_type, TagType::EvidenceSprint);
        assert_eq!(entry.commit, "abc1234");
        assert!(entry.missing_files.is_empty());
        assert_eq!(entry.ac.html, "<h1>AC</h1>\n<ul><li>signup works</li></ul>");
        assert_eq!(entry.demo_url(), Some("https://demo.test/signup"));
        assert_eq!(entry.delta.html, "<p>Added <strong>signup</strong></p>");
        for doc in [&entry.ac, &entry.demo, &entry.delta] {
            assert_invariant(doc);
        }
    }

    #[test]
    fn absent_document_is_missing_not_error() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file(TAG, "proof/AC.md", "ac")
            .with_file(TAG, "proof/DEMO.md", "demo");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();

        assert_eq!(entry.missing_files, vec!["DELTA.md"]);
        assert!(entry.delta.missing);
        assert!(!entry.ac.missing);
        assert!(!entry.demo.missing);
        assert_invariant(&entry.delta);
    }

    #[test]
    fn missing_files_keep_fixed_order() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file(TAG, "proof/DEMO.md", "demo");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();
        assert_eq!(entry.missing_files, vec!["AC.md", "DELTA.md"]);
    }

    #[test]
    fn blank_document_counts_as_missing() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file(TAG, "proof/AC.md", "  \n\n");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();
        assert!(entry.ac.missing);
        assert_invariant(&entry.ac);
        assert_eq!(entry.missing_files, vec!["AC.md", "DEMO.md", "DELTA.md"]);
    }

    #[test]
    fn url_only_extracted_from_demo() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file(TAG, "proof/AC.md", "see https://ac.test")
            .with_file(TAG, "proof/DEMO.md", "no link yet");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();
        assert_eq!(entry.ac.url, None);
        assert_eq!(entry.demo_url(), None);
    }

    #[test]
    fn files_are_read_at_the_tag() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .with_file("HEAD", "proof/AC.md", "working tree content");

        let entry = resolve_entry(&vcs, &info(), "proof").unwrap();
        assert!(entry.ac.missing);
    }

    #[test]
    fn show_failure_is_fatal() {
        let vcs = FakeVcs::new()
            .with_tag(TAG, "abc1234")
            .failing_show(TAG, "fatal: bad object");

        let err = resolve_entry(&vcs, &info(), "proof").unwrap_err();
        assert!(matches!(err, VcsError::Failed { .. }));
    }

    #[test]
    fn vanished_tag_is_fatal() {
        let vcs = FakeVcs::new().with_file(TAG, "proof/AC.md", "ac");

        let err = resolve_entry(&vcs, &info(), "proof").unwrap_err();
        assert!(matches!(err, VcsError::Failed { .. }));
    }
}
