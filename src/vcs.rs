//! Version-control queries used by the generator.
//!
//! The [`Vcs`] trait is the only way the rest of the crate talks to history:
//! list tags, read a file as committed at a revision, and resolve a revision
//! to its short hash. [`Git`] is the production implementation; it shells out
//! to the `git` binary in the repository root with a per-call timeout, so a
//! hung command fails the run instead of blocking it forever.
//!
//! ## Absence vs failure
//!
//! [`Vcs::show_file`] returns `Ok(None)` when the path simply did not exist
//! at that revision. Every other problem (bad revision, corrupt object,
//! spawn failure, timeout) is a [`VcsError`] and is fatal to the run.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Git command failed: {command}\n{stderr}")]
    Failed { command: String, stderr: String },
    #[error("`{command}` did not finish within {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

/// Read-only queries against version-control history.
///
/// `Sync` so tags can be resolved on a rayon pool.
pub trait Vcs: Sync {
    /// Tags matching any of the glob `patterns`, one per entry, in the order
    /// the backend lists them.
    fn list_tags(&self, patterns: &[String]) -> Result<Vec<String>, VcsError>;

    /// Content of `path` as committed at `revision`, or `None` if the path did
    /// not exist there.
    fn show_file(&self, revision: &str, path: &str) -> Result<Option<String>, VcsError>;

    /// Abbreviated commit hash `revision` resolves to.
    fn short_hash(&self, revision: &str) -> Result<String, VcsError>;
}

/// `git` subprocess backend.
#[derive(Debug, Clone)]
pub struct Git {
    binary: String,
    root: PathBuf,
    timeout: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl Git {
    pub fn new(binary: impl Into<String>, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            root: root.into(),
            timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `git <args>` in the repository root and return its stdout.
    fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        let command = self.describe(args);
        debug!(%command, "running");

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        match wait_with_timeout(child, self.timeout)? {
            None => Err(VcsError::Timeout {
                command,
                timeout: self.timeout,
            }),
            Some(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Some(output) => Err(VcsError::Failed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.binary.as_str()];
        parts.extend_from_slice(args);
        parts.join(" ")
    }
}

impl Vcs for Git {
    fn list_tags(&self, patterns: &[String]) -> Result<Vec<String>, VcsError> {
        let mut args = vec!["tag", "--list"];
        args.extend(patterns.iter().map(String::as_str));
        let stdout = self.run(&args)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn show_file(&self, revision: &str, path: &str) -> Result<Option<String>, VcsError> {
        let object = format!("{revision}:{path}");
        match self.run(&["show", &object]) {
            Ok(content) => Ok(Some(content)),
            Err(VcsError::Failed { stderr, .. }) if is_missing_path(&stderr) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn short_hash(&self, revision: &str) -> Result<String, VcsError> {
        Ok(self.run(&["rev-parse", "--short", revision])?.trim().to_string())
    }
}

/// Whether git's stderr says the path is absent from an otherwise valid tree.
///
/// Git phrases this as either
/// `fatal: path 'proof/AC.md' does not exist in 'tag'` or
/// `fatal: path 'proof/AC.md' exists on disk, but not in 'tag'`.
/// Unknown revisions (`invalid object name`, `bad revision`) are not matched.
pub fn is_missing_path(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("fatal: path ")
        && (stderr.contains("does not exist in") || stderr.contains("exists on disk, but not in"))
}

/// Wait for `child`, killing it once `timeout` has passed.
///
/// Returns `None` on timeout. Stdout and stderr are drained on helper
/// threads so a chatty command cannot stall on a full pipe while we wait.
pub(crate) fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
) -> std::io::Result<Option<Output>> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            // Best effort: the process may have exited between the checks.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Some(Output {
        status,
        stdout: join_reader(stdout_reader)?,
        stderr: join_reader(stderr_reader)?,
    }))
}

fn drain<R: Read>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join_reader(handle: thread::JoinHandle<std::io::Result<Vec<u8>>>) -> std::io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| std::io::Error::other("pipe reader thread panicked"))?
}
