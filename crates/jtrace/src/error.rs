//! Error types for the jtrace command-line front end.
//!
//! Wraps the library crates' errors and adds the failures that only the
//! front end can hit: unreadable settings files and malformed hook
//! signatures typed on the command line.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io;
use std::path::PathBuf;

use jtrace_core::DomainError;
use jtrace_engine::EngineError;
use jtrace_protocol::StateError;
use thiserror::Error;

// ============================================================================
// CLI Error Type
// ============================================================================

/// Front-end errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// The settings file exists but could not be parsed.
    #[error("Invalid settings file {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A settings file named with `--config` does not exist.
    #[error("Settings file not found: {}", .0.display())]
    SettingsNotFound(PathBuf),

    /// The hook workspace file could not be read or written.
    #[error("Hook workspace {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The hook workspace file is not a valid state document.
    #[error("Invalid hook workspace: {0}")]
    State(#[from] StateError),

    /// A hook signature typed on the command line could not be parsed.
    #[error("Invalid hook signature '{signature}': {reason}")]
    Signature { signature: String, reason: String },

    /// Hook model rule violated (unknown key, bad patch rule).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Engine session failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    pub(crate) fn signature(signature: &str, reason: impl Into<String>) -> Self {
        Self::Signature {
            signature: signature.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result type alias for front-end operations.
pub type Result<T> = std::result::Result<T, CliError>;

// ============================================================================
// Tests
// ============================================================================
