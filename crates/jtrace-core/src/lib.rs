//! jtrace Core - Shared types for method hooking sessions
//!
//! This crate provides the domain model shared between the script
//! compiler (`jtrace-script`), the engine supervisor (`jtrace-engine`)
//! and the command-line front end (`jtrace`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod device;
pub mod error;
pub mod hook;
pub mod method;
pub mod options;
pub mod patch;
pub mod registry;
pub mod template;
pub mod types;

/// Tag prefixed to every line the generated instrumentation program prints.
///
/// The supervisor uses it to split the engine's prompt frame from hook output.
pub const LOG_TAG: &str = "[JTRACE]";

// Re-exports for convenience
pub use config::{DeviceMode, SessionConfig, TargetIdentity};
pub use device::{AdbDevice, ProcessInfo, ServerStatus};
pub use error::{DomainError, DomainResult};
pub use hook::{HookRecord, HookSpec, SnippetPosition, SourceLocation, SourceRef, TemplateSelection};
pub use method::{MethodTarget, CONSTRUCTOR_NAME};
pub use options::ScriptOptions;
pub use patch::{ReturnPatchMode, ReturnPatchRule};
pub use registry::{HookRegistry, RegisteredHook};
pub use template::ScriptTemplate;
