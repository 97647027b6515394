//! # Proofgen
//!
//! A static site generator for a "proof log": a public, tamper-evident record
//! of delivered work. Git tags are the data source. Each tag named
//! `evidence-sprint_<feature>_<date>` or `ac-green_<feature>_<date>` becomes
//! one entry, and its acceptance criteria, demo and delta are read from the
//! tagged commit, never from the working tree.
//!
//! # Architecture
//!
//! ```text
//! git tags ─► discover ─► resolve (per tag, parallel) ─► generate ─► public/proof/
//!                                                           └─► emit site.proof_updated@1.0
//! ```
//!
//! Every run is a full, stateless regeneration. Nothing is cached between
//! runs; the same tags and the same commits always produce the same pages.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tag`] | Proof tag naming convention and parser |
//! | [`vcs`] | Version-control queries: the [`vcs::Vcs`] trait and its git implementation |
//! | [`resolve`] | Reads `AC.md`, `DEMO.md`, `DELTA.md` at a tag into a [`resolve::ProofEntry`] |
//! | [`markdown`] | The small markdown dialect proof documents are written in |
//! | [`discover`] | Lists, orders, limits and resolves proof tags |
//! | [`generate`] | Renders index, detail pages, stylesheet and JSON feed using Maud |
//! | [`events`] | Fire-and-forget notification after a build |
//! | [`pipeline`] | Runs discovery → assembly → notification |
//! | [`config`] | `proofgen.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## History Over Working Tree
//!
//! Documents are read with `git show <tag>:<path>`. An entry shows exactly
//! what was committed when the tag was cut, so editing `proof/AC.md` later
//! cannot rewrite an old entry.
//!
//! ## Missing Is Not Failure
//!
//! A tag without `DEMO.md` still publishes: the page shows a "Missing" chip
//! and a placeholder. Only real version-control failures (bad revision,
//! corrupt object, timeout) abort the run, so a broken history never
//! silently produces an incomplete log.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Interpolation is
//! escaped by default; the markdown renderer's output is the only markup
//! inserted as-is, and it escapes its input before adding tags.

pub mod config;
pub mod discover;
pub mod events;
pub mod generate;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod tag;
pub mod vcs;

#[cfg(test)]
pub(crate) mod test_helpers;
