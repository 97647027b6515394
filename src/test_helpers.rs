//! Shared test utilities for the proofgen test suite.
//!
//! Provides an in-memory [`FakeVcs`] standing in for git, a recording event
//! sink, and builders for resolved entries.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let vcs = FakeVcs::new()
//!     .with_tag("ac-green_login_2025-01-05", "abc1234")
//!     .with_file("ac-green_login_2025-01-05", "proof/AC.md", "# AC");
//!
//! let entry = resolve_entry(&vcs, &parse_tag("ac-green_login_2025-01-05").unwrap(), "proof")?;
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use crate::events::{EventError, EventSink};
use crate::resolve::{DocumentKind, ProofDocument, ProofEntry};
use crate::tag::parse_tag;
use crate::vcs::{Vcs, VcsError};

// =========================================================================
// Fake version control
// =========================================================================

/// In-memory history: tags with hashes, files per revision, injected failures.
///
/// Revisions are "known" once they have a hash or a file. Unknown revisions
/// fail like git does for a bad revision.
#[derive(Default)]
pub struct FakeVcs {
    tags: Vec<String>,
    hashes: HashMap<String, String>,
    files: HashMap<(String, String), String>,
    broken: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag that lists and resolves to `hash`.
    pub fn with_tag(mut self, tag: &str, hash: &str) -> Self {
        self.tags.push(tag.to_string());
        self.hashes.insert(tag.to_string(), hash.to_string());
        self
    }

    /// Commit `content` at `path` for `revision`.
    pub fn with_file(mut self, revision: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((revision.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Make every `show_file` at `revision` fail with `stderr`.
    pub fn failing_show(mut self, revision: &str, stderr: &str) -> Self {
        self.broken.insert(revision.to_string(), stderr.to_string());
        self
    }

    fn knows(&self, revision: &str) -> bool {
        self.hashes.contains_key(revision) || self.files.keys().any(|(rev, _)| rev == revision)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Glob match supporting a single trailing `*`, which is all tag patterns use.
fn pattern_matches(pattern: &str, tag: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => tag.starts_with(prefix),
        None => pattern == tag,
    }
}

impl Vcs for FakeVcs {
    fn list_tags(&self, patterns: &[String]) -> Result<Vec<String>, VcsError> {
        self.record(format!("tag --list {}", patterns.join(" ")));
        Ok(self
            .tags
            .iter()
            .filter(|tag| patterns.iter().any(|p| pattern_matches(p, tag)))
            .cloned()
            .collect())
    }

    fn show_file(&self, revision: &str, path: &str) -> Result<Option<String>, VcsError> {
        self.record(format!("show {revision}:{path}"));
        if let Some(stderr) = self.broken.get(revision) {
            return Err(VcsError::Failed {
                command: format!("git show {revision}:{path}"),
                stderr: stderr.clone(),
            });
        }
        if !self.knows(revision) {
            return Err(VcsError::Failed {
                command: format!("git show {revision}:{path}"),
                stderr: format!("fatal: invalid object name '{revision}'."),
            });
        }
        Ok(self
            .files
            .get(&(revision.to_string(), path.to_string()))
            .cloned())
    }

    fn short_hash(&self, revision: &str) -> Result<String, VcsError> {
        self.record(format!("rev-parse --short {revision}"));
        self.hashes
            .get(revision)
            .cloned()
            .ok_or_else(|| VcsError::Failed {
                command: format!("git rev-parse --short {revision}"),
                stderr: format!("fatal: ambiguous argument '{revision}': unknown revision"),
            })
    }
}

// =========================================================================
// Recording event sink
// =========================================================================

/// Sink that remembers every event and reports a listener as present.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &str, payload: &serde_json::Value) -> Result<bool, EventError> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload.clone()));
        Ok(true)
    }
}

// =========================================================================
// Entry builders
// =========================================================================

/// Entry for `tag` with every document present and a demo link.
pub fn full_entry(tag: &str) -> ProofEntry {
    entry_with(tag, &[])
}

/// Entry for `tag` with the given documents missing.
///
/// Panics if `tag` is not a proof tag.
pub fn entry_with(tag: &str, missing: &[DocumentKind]) -> ProofEntry {
    let info = parse_tag(tag).unwrap_or_else(|| panic!("'{tag}' is not a proof tag"));
    let doc = |kind: DocumentKind, body: &str| {
        let content = (!missing.contains(&kind)).then(|| body.to_string());
        ProofDocument::from_markdown(kind, content)
    };
    ProofEntry::new(
        &info,
        "abc1234".to_string(),
        doc(DocumentKind::Ac, "# Acceptance\n- it works"),
        doc(DocumentKind::Demo, "Watch https://demo.test/video"),
        doc(DocumentKind::Delta, "Changed **one** thing"),
    )
}
