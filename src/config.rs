//! Generator configuration module.
//!
//! Handles loading, validating, and merging `proofgen.toml`. The file lives in
//! the repository root and is optional: stock defaults are serialized to a
//! TOML table and the user file is merged on top, so the file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output = "public/proof"           # Output directory (relative to repo root)
//! proof_dir = "proof"               # Where AC.md / DEMO.md / DELTA.md live at each tag
//! tag_patterns = ["evidence-sprint_*", "ac-green_*"]
//! latest_count = 10                 # Entries listed on the index page
//! feed_base = "/proof"              # URL prefix for files.* in index.json
//! tokens_file = "public/styles/tokens.css"
//!
//! [git]
//! binary = "git"
//! timeout_secs = 30                 # Per-command limit
//!
//! [events]
//! name = "site.proof_updated@1.0"
//! command = []                      # e.g. ["node", "scripts/emit.js"]
//! timeout_secs = 30                 # Emitter is killed after this long
//!
//! [tokens]                          # Fallback palette when tokens_file is absent
//! bg = "#0B1020"
//! surface = "#151A21"
//! text = "#E6EAF2"
//! muted = "#9AA4B2"
//! accent_2 = "#64A8FF"
//! success = "#5CE27E"
//! radius = "12px"
//!
//! [processing]
//! max_processes = 4                 # Parallel tag resolution (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the repository root.
pub const CONFIG_FILE: &str = "proofgen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from `proofgen.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProofConfig {
    /// Output directory, relative to the repository root unless absolute.
    pub output: String,
    /// Directory holding the proof documents in each tagged tree.
    pub proof_dir: String,
    /// Glob patterns passed to `git tag --list`.
    pub tag_patterns: Vec<String>,
    /// How many entries the index page lists.
    pub latest_count: usize,
    /// URL prefix of detail pages, used for `files.*` in the feed.
    pub feed_base: String,
    /// Shared design-token stylesheet, relative to the repository root.
    pub tokens_file: String,
    pub git: GitConfig,
    pub events: EventsConfig,
    /// Fallback design tokens used when `tokens_file` does not exist.
    pub tokens: TokenPalette,
    pub processing: ProcessingConfig,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            output: "public/proof".to_string(),
            proof_dir: "proof".to_string(),
            tag_patterns: vec!["evidence-sprint_*".to_string(), "ac-green_*".to_string()],
            latest_count: 10,
            feed_base: "/proof".to_string(),
            tokens_file: "public/styles/tokens.css".to_string(),
            git: GitConfig::default(),
            events: EventsConfig::default(),
            tokens: TokenPalette::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ProofConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latest_count == 0 {
            return Err(ConfigError::Validation(
                "latest_count must be at least 1".into(),
            ));
        }
        if self.git.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "git.timeout_secs must be at least 1".into(),
            ));
        }
        if self.tag_patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "tag_patterns must not be empty".into(),
            ));
        }
        if self.proof_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "proof_dir must not be empty".into(),
            ));
        }
        if self.events.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "events.timeout_secs must be at least 1".into(),
            ));
        }
        if self.events.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "events.name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// How to reach git.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub binary: String,
    /// Upper bound for any single git invocation.
    pub timeout_secs: u64,
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Regeneration event settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Event name emitted after a successful build.
    pub name: String,
    /// External emitter, as program followed by arguments. Empty = none.
    pub command: Vec<String>,
    /// Upper bound for the external emitter.
    pub timeout_secs: u64,
}

impl EventsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            name: "site.proof_updated@1.0".to_string(),
            command: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Design tokens the layout rules rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenPalette {
    pub bg: String,
    pub surface: String,
    pub text: String,
    pub muted: String,
    pub accent_2: String,
    pub success: String,
    pub radius: String,
}

impl Default for TokenPalette {
    fn default() -> Self {
        Self {
            bg: "#0B1020".to_string(),
            surface: "#151A21".to_string(),
            text: "#E6EAF2".to_string(),
            muted: "#9AA4B2".to_string(),
            accent_2: "#64A8FF".to_string(),
            success: "#5CE27E".to_string(),
            radius: "12px".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel tag resolution workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ProofConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `proofgen.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ProofConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ProofConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `proofgen.toml` in the repository root.
pub fn load_config(root: &Path) -> Result<ProofConfig, ConfigError> {
    resolve_config(load_raw_config(root)?)
}

/// Returns a fully-commented stock `proofgen.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# proofgen configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Output directory for the generated site, relative to the repository root.
output = "public/proof"

# Directory that holds AC.md, DEMO.md and DELTA.md in each tagged commit.
proof_dir = "proof"

# Tags considered for publication (git tag --list patterns).
# Listed tags that do not follow <type>_<feature>_<YYYY-MM-DD> are skipped.
tag_patterns = ["evidence-sprint_*", "ac-green_*"]

# Number of entries listed on the index page.
latest_count = 10

# URL prefix of the detail pages, used for files.* links in index.json.
feed_base = "/proof"

# Shared design-token stylesheet prepended to proof.css.
tokens_file = "public/styles/tokens.css"

# ---------------------------------------------------------------------------
# Git
# ---------------------------------------------------------------------------
[git]
binary = "git"

# Any git command running longer than this fails the build.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Regeneration event
# ---------------------------------------------------------------------------
[events]
name = "site.proof_updated@1.0"

# External emitter, invoked as: <command...> <event-name> <payload-json>
# Leave empty to only log the event.
command = []

# A handler running longer than this is killed and fails the build.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Fallback design tokens (used when tokens_file does not exist)
# ---------------------------------------------------------------------------
[tokens]
bg = "#0B1020"
surface = "#151A21"
text = "#E6EAF2"
muted = "#9AA4B2"
accent_2 = "#64A8FF"
success = "#5CE27E"
radius = "12px"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel tag resolution workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate the design-token custom properties from the fallback palette.
pub fn generate_token_css(tokens: &TokenPalette) -> String {
    format!(
        r#":root {{
  --slk-bg: {bg};
  --slk-surface: {surface};
  --slk-text: {text};
  --slk-muted: {muted};
  --slk-accent-2: {accent_2};
  --slk-success: {success};
  --slk-radius: {radius};
  --slk-gap-2: 8px;
  --slk-gap-3: 12px;
  --slk-gap-4: 16px;
  --slk-gap-5: 24px;
  --slk-gap-6: 40px;
}}

body {{
  margin: 0;
  background: var(--slk-bg);
  color: var(--slk-text);
  font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
  line-height: 1.5;
}}

a {{ color: var(--slk-accent-2); }}"#,
        bg = tokens.bg,
        surface = tokens.surface,
        text = tokens.text,
        muted = tokens.muted,
        accent_2 = tokens.accent_2,
        success = tokens.success,
        radius = tokens.radius,
    )
}
