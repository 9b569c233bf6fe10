//! jtrace Protocol - Textual formats at the system's boundaries
//!
//! This crate provides the formats jtrace exchanges with the outside
//! world: the persisted hook-state JSON document, the engine's log
//! stream, the engine version string and the custom-script list.

pub mod scripts;
pub mod state;
pub mod stream;
pub mod version;

pub use scripts::{format_custom_script_paths, parse_custom_script_paths, CustomScriptEntry};
pub use state::{
    HookEntry, MethodTargetData, ReturnPatchRuleData, SavedState, ScriptOptionsData, StateError,
    STATE_VERSION,
};
pub use stream::{Classified, StreamEvent, StreamFilter, StreamKind, PROMPT_MARKER, STDERR_PREFIX};
pub use version::{EngineVersion, VersionError};
