//! Build orchestration: discovery, assembly, notification.
//!
//! ```text
//! collect_entries ─► proof.css ─► index.html ─► <tag>/index.html … ─► index.json ─► emit
//! ```
//!
//! Every step runs in that order, and any error stops the run. Output files
//! already written stay on disk; a rerun overwrites them.

use crate::config::{ConfigError, ProofConfig};
use crate::discover::{self, GenerationResult};
use crate::events::{EventError, EventSink};
use crate::generate::{self, GenerateError};
use crate::resolve::ProofEntry;
use crate::vcs::{Vcs, VcsError};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("version control error: {0}")]
    Vcs(#[from] VcsError),
    #[error("generate error: {0}")]
    Generate(#[from] GenerateError),
    #[error("event error: {0}")]
    Event(#[from] EventError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Collaborators shared by every run.
pub struct ProofContext<'a> {
    pub vcs: &'a dyn Vcs,
    pub sink: &'a dyn EventSink,
    pub config: &'a ProofConfig,
    /// Repository root, used to locate the design tokens file.
    pub repo_root: &'a Path,
}

/// Per-run choices, usually from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub out_dir: PathBuf,
    /// `None` publishes every tag.
    pub limit: Option<usize>,
    pub write_json: bool,
}

/// What a run produced.
#[derive(Debug)]
pub struct BuildSummary {
    pub out_dir: PathBuf,
    pub entries: Vec<ProofEntry>,
    pub skipped: Vec<String>,
    pub stylesheet: PathBuf,
    pub index: PathBuf,
    pub details: Vec<PathBuf>,
    pub feed: Option<PathBuf>,
    /// Whether a listener handled the notification.
    pub event_handled: bool,
}

impl BuildSummary {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Regenerate the whole proof log from history.
pub fn generate_proof_site(
    ctx: &ProofContext,
    options: &BuildOptions,
) -> Result<BuildSummary, PipelineError> {
    let config = ctx.config;
    let GenerationResult { entries, skipped } = discover::collect_entries(
        ctx.vcs,
        &config.tag_patterns,
        &config.proof_dir,
        options.limit,
    )?;

    let out_dir = &options.out_dir;
    let tokens = generate::load_tokens(ctx.repo_root, config)?;
    let stylesheet = generate::write_stylesheet(out_dir, &tokens)?;
    let index = generate::write_index(out_dir, &entries, config.latest_count)?;
    let details = entries
        .iter()
        .map(|entry| generate::write_detail(out_dir, entry))
        .collect::<Result<Vec<_>, _>>()?;
    let feed = if options.write_json {
        Some(generate::write_feed(out_dir, &entries, &config.feed_base)?)
    } else {
        None
    };
    info!(
        count = entries.len(),
        out_dir = %out_dir.display(),
        "proof site written"
    );

    let payload = update_payload(&entries, chrono::Utc::now().to_rfc3339());
    let event_handled = ctx.sink.emit(&config.events.name, &payload)?;

    Ok(BuildSummary {
        out_dir: out_dir.clone(),
        entries,
        skipped,
        stylesheet,
        index,
        details,
        feed,
        event_handled,
    })
}

/// Notification payload: entry count, newest tag (`null` when none), time.
pub fn update_payload(entries: &[ProofEntry], timestamp: String) -> Value {
    json!({
        "count": entries.len(),
        "last_tag": entries.first().map(|entry| entry.tag.as_str()),
        "timestamp": timestamp,
    })
}
