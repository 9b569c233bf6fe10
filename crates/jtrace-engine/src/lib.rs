//! jtrace Engine - Instrumentation engine process plumbing
//!
//! This crate drives the external engine executables:
//!
//! - [`Supervisor`]: one live engine session at a time, with stream
//!   classification, live script updates and single-fire exit notification
//! - [`CapabilityProber`]: cached detection of optional engine flags
//! - [`command`]: argument-vector construction and `split_args`
//! - [`processes`] and [`adb`]: device and process discovery
//!
//! All functions block the calling thread; async callers should use
//! `spawn_blocking`.

pub mod adb;
pub mod capability;
pub mod command;
pub mod error;
pub mod process;
pub mod processes;
pub mod supervisor;

pub use capability::{engine_version, Capabilities, CapabilityProber};
pub use command::{build_command, device_args, split_args, LaunchFlags};
pub use error::{EngineError, ProcessError, Result};
pub use process::ProcessOutput;
pub use processes::list_processes;
pub use supervisor::{ApplyOutcome, ExitCallback, ExitReason, LogSink, Supervisor};
