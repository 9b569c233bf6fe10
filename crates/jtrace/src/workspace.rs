//! The hook workspace file.
//!
//! One JSON state document holds the configured hooks and the custom
//! script list. The file is rewritten atomically (temp file in the same
//! directory, then rename) so a `run` session polling it never reads a
//! half-written document.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jtrace_core::HookRegistry;
use jtrace_protocol::{format_custom_script_paths, parse_custom_script_paths, CustomScriptEntry, SavedState};
use jtrace_script::comment_text;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};

/// Header line placed before each custom script in the compiled program.
pub const CUSTOM_SCRIPT_HEADER: &str = "// -- ";

/// In-memory view of the workspace file.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    pub registry: HookRegistry,
    pub custom_scripts: Vec<CustomScriptEntry>,
}

impl WorkspaceState {
    fn to_document(&self) -> SavedState {
        SavedState::from_registry(&self.registry, &format_custom_script_paths(&self.custom_scripts))
    }

    fn from_document(state: &SavedState) -> Self {
        Self {
            registry: state.to_registry(),
            custom_scripts: parse_custom_script_paths(&state.custom_script_paths),
        }
    }
}

/// Handle to the workspace file on disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the workspace; a missing file is an empty workspace.
    pub fn load(&self) -> Result<WorkspaceState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No workspace file yet");
                return Ok(WorkspaceState::default());
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let document = SavedState::from_json(&text)?;
        let state = WorkspaceState::from_document(&document);
        let dropped = document.hooks.len().saturating_sub(state.registry.len());
        if dropped > 0 {
            warn!(path = %self.path.display(), dropped, "Skipped workspace entries without a hook key");
        }
        debug!(path = %self.path.display(), hooks = state.registry.len(), "Loaded workspace");
        Ok(state)
    }

    /// Writes the workspace, creating parent directories as needed.
    pub fn save(&self, state: &WorkspaceState) -> Result<()> {
        let json = state.to_document().to_json()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes()).map_err(|e| self.io_error(e))?;
        file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        file.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        info!(path = %self.path.display(), hooks = state.registry.len(), "Saved workspace");
        Ok(())
    }

    /// Modification time and length, or `None` if the file is missing.
    /// Used to detect edits between polls.
    pub fn fingerprint(&self) -> Option<(SystemTime, u64)> {
        let meta = fs::metadata(&self.path).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }

    fn io_error(&self, source: io::Error) -> CliError {
        CliError::Workspace {
            path: self.path.clone(),
            source,
        }
    }
}

// ============================================================================
// Custom Scripts
// ============================================================================

/// Reads enabled custom scripts into global program fragments.
///
/// Each fragment starts with a `// -- <path>` line. Unreadable files are
/// skipped; they are reported through `report` only the first time a path
/// fails, tracked in `reported`.
pub fn collect_globals(
    entries: &[CustomScriptEntry],
    reported: &mut HashSet<String>,
    mut report: impl FnMut(&str),
) -> Vec<String> {
    let mut globals = Vec::new();
    for entry in entries.iter().filter(|e| e.enabled) {
        match fs::read_to_string(&entry.path) {
            Ok(code) => {
                reported.remove(&entry.path);
                globals.push(format!("{CUSTOM_SCRIPT_HEADER}{}\n{code}", comment_text(&entry.path)));
            }
            Err(e) => {
                if reported.insert(entry.path.clone()) {
                    warn!(path = %entry.path, error = %e, "Custom script unreadable");
                    report(&format!("Custom script not readable: {} ({e})", entry.path));
                }
            }
        }
    }
    globals
}
