//! Regeneration notifications.
//!
//! After a successful build the pipeline emits one event so other systems
//! can react (cache purges, chat notifications). The sink is fire-and-forget:
//! [`EventSink::emit`] reports whether anything handled the event, and "no
//! handler" is a normal outcome, not an error.

use crate::config::EventsConfig;
use crate::vcs::wait_with_timeout;
use serde_json::Value;
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event handler `{command}` failed ({status}): {stderr}")]
    HandlerFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("event handler `{command}` did not finish within {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

/// Destination for named events with JSON payloads.
pub trait EventSink: Sync {
    /// Deliver `event`. Returns `Ok(true)` if a handler received it.
    fn emit(&self, event: &str, payload: &Value) -> Result<bool, EventError>;
}

/// Sink with no handler: logs the event and reports it as unhandled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, event: &str, payload: &Value) -> Result<bool, EventError> {
        info!(event, %payload, "no event handler configured, skipping");
        Ok(false)
    }
}

/// Sink that hands each event to an external program.
///
/// Runs `<program> <args...> <event> <payload-json>`. A program that is not
/// installed counts as "no handler"; one that runs and fails, or outlives
/// `timeout`, is an error.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSink {
    /// Build from a command line split into words. `None` when empty.
    pub fn from_command(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    fn describe(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl EventSink for CommandSink {
    fn emit(&self, event: &str, payload: &Value) -> Result<bool, EventError> {
        let payload_json = serde_json::to_string(payload)?;
        let child = match Command::new(&self.program)
            .args(&self.args)
            .arg(event)
            .arg(&payload_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(event, handler = %self.describe(), "event handler not installed, skipping");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        let Some(output) = wait_with_timeout(child, self.timeout)? else {
            return Err(EventError::Timeout {
                command: self.describe(),
                timeout: self.timeout,
            });
        };

        if !output.status.success() {
            return Err(EventError::HandlerFailed {
                command: self.describe(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(event, handler = %self.describe(), "event delivered");
        Ok(true)
    }
}

/// Pick the sink for a configured emitter command (empty means none).
pub fn sink_for(config: &EventsConfig) -> Box<dyn EventSink> {
    match CommandSink::from_command(&config.command, config.timeout()) {
        Some(sink) => Box::new(sink),
        None => Box::new(NoopSink),
    }
}

/// Parse a payload given on the command line. Invalid JSON falls back to `{}`.
pub fn parse_payload(raw: Option<&str>) -> Value {
    match raw.map(serde_json::from_str::<Value>) {
        None => Value::Object(Default::default()),
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "invalid JSON payload, using an empty object");
            Value::Object(Default::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn noop_sink_reports_unhandled() {
        assert!(!NoopSink.emit("site.proof_updated@1.0", &json!({})).unwrap());
    }

    #[test]
    fn empty_command_has_no_sink() {
        assert!(CommandSink::from_command(&[], SECOND).is_none());
    }

    #[test]
    fn uninstalled_handler_is_not_an_error() {
        let sink =
            CommandSink::from_command(&["proofgen-no-such-emitter".to_string()], SECOND).unwrap();
        assert!(!sink.emit("x", &json!({"count": 0})).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn handler_receives_event_and_payload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("event.txt");
        let script = format!("printf '%s %s' \"$0\" \"$1\" > '{}'", out.display());
        let sink =
            CommandSink::from_command(&["sh".to_string(), "-c".to_string(), script], SECOND * 5)
                .unwrap();

        let handled = sink.emit("site.proof_updated@1.0", &json!({"count": 2})).unwrap();

        assert!(handled);
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, r#"site.proof_updated@1.0 {"count":2}"#);
    }

    #[cfg(unix)]
    #[test]
    fn failing_handler_is_an_error() {
        let sink = CommandSink::from_command(
            &[
                "sh".to_string(),
                "-c".to_string(),
                "echo nope >&2; exit 1".to_string(),
            ],
            SECOND * 5,
        )
        .unwrap();
        let err = sink.emit("x", &json!({})).unwrap_err();
        match err {
            EventError::HandlerFailed { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("expected HandlerFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn hung_handler_is_killed_after_timeout() {
        let sink = CommandSink::from_command(
            &["sh".to_string(), "-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(100),
        )
        .unwrap();
        let started = std::time::Instant::now();

        let err = sink.emit("x", &json!({})).unwrap_err();

        assert!(matches!(err, EventError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn sink_for_empty_command_is_noop() {
        let sink = sink_for(&EventsConfig::default());
        assert!(!sink.emit("x", &json!({})).unwrap());
    }

    #[test]
    fn payload_parsing_falls_back_to_empty_object() {
        assert_eq!(parse_payload(None), json!({}));
        assert_eq!(parse_payload(Some(r#"{"a":1}"#)), json!({"a": 1}));
        assert_eq!(parse_payload(Some("not json")), json!({}));
    }
}
