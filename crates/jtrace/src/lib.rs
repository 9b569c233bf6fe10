//! jtrace CLI - Library modules
//!
//! Everything behind the `jtrace` binary except argument dispatch and
//! logging setup:
//!
//! - [`settings`]: the optional TOML settings file
//! - [`workspace`]: the JSON hook workspace and custom script loading
//! - [`hooks`]: signature parsing and hook edits
//! - [`commands`]: one function per non-`run` subcommand
//! - [`runner`]: the async `run` loop around the engine supervisor

pub mod cli;
pub mod commands;
pub mod error;
pub mod hooks;
pub mod runner;
pub mod settings;
pub mod workspace;

pub use cli::Cli;
pub use error::{CliError, Result};
pub use runner::{run_session, RunOptions, RunOutcome};
pub use settings::Settings;
pub use workspace::{Workspace, WorkspaceState};
