//! Process listing through the engine's process-list executable.

use std::time::Duration;

use jtrace_core::{ProcessInfo, SessionConfig};
use tracing::debug;

use crate::command::device_args;
use crate::process;

/// Timeout for one process listing.
pub const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Lists processes on the configured device, including package names.
///
/// Returns an empty list on any failure, including a missing executable.
pub fn list_processes(config: &SessionConfig) -> Vec<ProcessInfo> {
    let exe = config.process_list_executable();
    if !process::is_executable_available(exe) {
        debug!(exe, "Process-list executable not found");
        return Vec::new();
    }

    let mut args = device_args(config);
    args.push("-a".to_string());

    match process::run(exe, &args, LIST_TIMEOUT) {
        Ok(output) if output.success() => parse_process_list(&output.stdout),
        Ok(output) => {
            debug!(exe, code = ?output.code, "Process listing failed");
            Vec::new()
        }
        Err(e) => {
            debug!(exe, error = %e, "Process listing failed");
            Vec::new()
        }
    }
}

/// Parses `PID NAME...` lines, skipping blanks, the header and separators.
pub fn parse_process_list(text: &str) -> Vec<ProcessInfo> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("PID"))
        .filter_map(|line| {
            let (pid, name) = line.split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let name = name.trim();
            (!name.is_empty()).then(|| ProcessInfo::new(pid, name))
        })
        .collect()
}
