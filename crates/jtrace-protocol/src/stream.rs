//! Classification of engine output lines.
//!
//! Every line the engine writes passes through [`StreamFilter::classify`],
//! which decides what (if anything) is shown to the user and whether the
//! line signals the end of the session.

use jtrace_core::LOG_TAG;
use serde::{Deserialize, Serialize};

/// Prefix applied to lines that arrived on the engine's stderr.
pub const STDERR_PREFIX: &str = "[stderr]";

/// The engine's interactive prompt marker. Hook output printed while the
/// prompt is visible arrives glued to it.
pub const PROMPT_MARKER: &str = "]-> ";

/// Which engine stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// A session-ending condition detected in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// The engine reported the target terminated or crashed.
    SessionTerminated,
    /// The engine's own runtime is shutting down.
    EngineShutdown,
}

impl StreamEvent {
    /// Exit code reported to exit listeners for this event.
    pub fn exit_code(self) -> i32 {
        match self {
            StreamEvent::SessionTerminated => 0,
            StreamEvent::EngineShutdown => -1,
        }
    }
}

/// Result of classifying one raw line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classified {
    /// Lines to forward to the log sink, in order.
    pub lines: Vec<String>,
    pub event: Option<StreamEvent>,
}

/// Line classifier with configurable phrase sets.
///
/// All matching is case-insensitive substring matching, except
/// `shutdown_markers` which must match at the start of the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFilter {
    /// Stderr noise that is never shown.
    pub suppressed_stderr: Vec<String>,
    /// Suppressed stderr lines that mean the engine itself is going away.
    pub shutdown_markers: Vec<String>,
    /// Phrases on either stream meaning the target is gone.
    pub termination_phrases: Vec<String>,
}

impl Default for StreamFilter {
    fn default() -> Self {
        Self {
            suppressed_stderr: [
                "fatal python error",
                "python runtime state",
                "interpreter shutdown",
                "_enter_buffered_busy",
                "current thread",
                "most recent call first",
                "<no python frame>",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            shutdown_markers: vec!["fatal python error".to_string()],
            termination_phrases: [
                "process terminated",
                "process crashed",
                "thank you for using frida",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl StreamFilter {
    /// Message emitted in place of a suppressed shutdown line.
    pub const SHUTDOWN_NOTICE: &'static str = "Engine exited (runtime shutdown).";

    pub fn classify(&self, kind: StreamKind, line: &str) -> Classified {
        let lower = line.to_lowercase();

        if kind == StreamKind::Stderr && contains_any(&lower, &self.suppressed_stderr) {
            let trimmed = lower.trim_start();
            let shutdown = self
                .shutdown_markers
                .iter()
                .any(|m| !m.is_empty() && trimmed.starts_with(&m.to_lowercase()));
            if shutdown {
                return Classified {
                    lines: vec![decorate(kind, Self::SHUTDOWN_NOTICE)],
                    event: Some(StreamEvent::EngineShutdown),
                };
            }
            return Classified::default();
        }

        let event = contains_any(&lower, &self.termination_phrases)
            .then_some(StreamEvent::SessionTerminated);

        let lines = match split_prompt(line) {
            Some((prompt, payload)) => vec![decorate(kind, prompt), decorate(kind, payload)],
            None => vec![decorate(kind, line)],
        };

        Classified { lines, event }
    }
}

fn contains_any(lower: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && lower.contains(&n.to_lowercase()))
}

/// Splits `"...]-> [JTRACE] payload"` into the prompt (up to and including
/// `]->`) and the tagged payload. Lines without a tagged payload after the
/// marker are left alone.
fn split_prompt(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(PROMPT_MARKER)?;
    let payload = &line[idx + PROMPT_MARKER.len()..];
    if payload.is_empty() || !payload.starts_with(LOG_TAG) {
        return None;
    }
    Some((&line[..idx + PROMPT_MARKER.trim_end().len()], payload))
}

fn decorate(kind: StreamKind, line: &str) -> String {
    match kind {
        StreamKind::Stderr if !line.starts_with(STDERR_PREFIX) => {
            format!("{STDERR_PREFIX} {line}")
        }
        _ => line.to_string(),
    }
}
