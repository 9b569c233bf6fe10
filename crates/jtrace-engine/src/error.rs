//! Error types for engine supervision.

use std::io;
use thiserror::Error;

/// Errors surfaced by the [`Supervisor`](crate::Supervisor).
///
/// Probe and discovery failures never appear here: they degrade to
/// "unsupported" or empty results instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configured executable looks like a path and does not exist
    #[error("engine executable not found: {path}")]
    ExecutableNotFound { path: String },

    /// A script update was requested with no session script on disk
    #[error("no active session script to update")]
    NoActiveSession,

    /// The engine process could not be started
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Writing or creating the session script failed
    #[error("session script I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors from running a short-lived helper process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable not found: {0}")]
    NotFound(String),

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
