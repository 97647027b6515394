//! Proof tag naming convention.
//!
//! A proof tag names one published unit of evidence:
//!
//! ```text
//! <type>_<feature>_<YYYY-MM-DD>
//! evidence-sprint_signup_2025-11-02
//! ac-green_Login-Flow_2025-01-05
//! ```
//!
//! - `type` is `evidence-sprint` or `ac-green`, matched case-insensitively.
//! - `feature` is letters, digits and hyphens. It is lowercased for grouping
//!   and filtering, and kept in its original case as the display label.
//! - the date is zero-padded ISO (`YYYY-MM-DD`), so it sorts lexicographically.
//!
//! Anything else (extra segments, other prefixes, `2025-1-5` style dates) is
//! not a proof tag. Ambiguous names are excluded, never repaired.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)^(evidence-sprint|ac-green)_([a-z0-9-]+)_([0-9]{4}-[0-9]{2}-[0-9]{2})$")
        .expect("tag pattern")
});

/// The two kinds of proof tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagType {
    EvidenceSprint,
    AcGreen,
}

impl TagType {
    pub const ALL: [TagType; 2] = [TagType::EvidenceSprint, TagType::AcGreen];

    /// Lowercase identifier, as written in tag names and `data-type` attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            TagType::EvidenceSprint => "evidence-sprint",
            TagType::AcGreen => "ac-green",
        }
    }

    /// Human-readable label for badges and legends.
    pub fn label(self) -> &'static str {
        match self {
            TagType::EvidenceSprint => "Evidence sprint",
            TagType::AcGreen => "AC green",
        }
    }

    /// CSS class of the colored dot in the index list.
    pub fn dot_class(self) -> &'static str {
        match self {
            TagType::EvidenceSprint => "dot-evidence",
            TagType::AcGreen => "dot-green",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        TagType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured view of a proof tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Full original tag, used for tie-breaks and output paths.
    pub tag: String,
    pub tag_type: TagType,
    /// Lowercased feature slug for grouping and filtering.
    pub feature: String,
    /// Feature slug as written in the tag.
    pub feature_label: String,
    /// `YYYY-MM-DD`, the primary sort key.
    pub date: String,
}

/// Parse a tag name, returning `None` for anything that is not a proof tag.
///
/// - `"ac-green_login-flow_2025-01-05"` → ac-green, feature `login-flow`, date `2025-01-05`
/// - `"AC-GREEN_Login_2025-01-05"` → ac-green, feature `login`, label `Login`
/// - `"evidence-sprint_a_b_2025-01-05"` → `None` (extra segment)
/// - `"release_v1_2025-01-01"` → `None` (unknown prefix)
pub fn parse_tag(tag: &str) -> Option<TagInfo> {
    let caps = TAG_PATTERN.captures(tag)?;
    let tag_type = TagType::from_keyword(&caps[1])?;
    let feature_label = caps[2].to_string();
    Some(TagInfo {
        tag: tag.to_string(),
        tag_type,
        feature: feature_label.to_ascii_lowercase(),
        feature_label,
        date: caps[3].to_string(),
    })
}
