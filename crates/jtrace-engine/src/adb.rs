//! Device discovery through the debug bridge.
//!
//! Every query absorbs failures: a missing bridge or an unreachable
//! device yields empty or negative results, never an error.

use std::collections::HashMap;
use std::time::Duration;

use jtrace_core::{AdbDevice, ProcessInfo, ServerStatus};
use tracing::debug;

use crate::error::ProcessError;
use crate::process::{self, ProcessOutput};

/// Timeout for one bridge invocation.
pub const ADB_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory the engine server is conventionally pushed to.
pub const SERVER_DIR: &str = "/data/local/tmp";

/// Name of the on-device engine server binary.
pub const SERVER_NAME: &str = "frida-server";

/// Lists devices from `adb devices -l`.
pub fn list_devices(adb: &str) -> Vec<AdbDevice> {
    match process::run(adb, ["devices", "-l"], ADB_TIMEOUT) {
        Ok(output) if output.success() => parse_devices(&output.stdout),
        Ok(output) => {
            debug!(adb, code = ?output.code, "adb devices failed");
            Vec::new()
        }
        Err(e) => {
            debug!(adb, error = %e, "adb devices failed");
            Vec::new()
        }
    }
}

/// Parses `adb devices -l` output.
pub fn parse_devices(text: &str) -> Vec<AdbDevice> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("List of devices"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            let status = parts.next()?;
            Some(AdbDevice {
                id: id.to_string(),
                status: status.to_string(),
                description: parts.collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// Runs `adb [-s <device>] shell <command>`.
pub fn shell(adb: &str, device: &str, command: &str) -> Result<ProcessOutput, ProcessError> {
    let device = device.trim();
    let mut args: Vec<&str> = Vec::with_capacity(4);
    if !device.is_empty() {
        args.push("-s");
        args.push(device);
    }
    args.push("shell");
    args.push(command);
    process::run(adb, args, ADB_TIMEOUT)
}

/// Returns false for empty ids and placeholder values (`loading`, `none`).
pub fn is_valid_device_id(device: &str) -> bool {
    let trimmed = device.trim();
    !trimmed.is_empty()
        && !trimmed.eq_ignore_ascii_case("loading")
        && !trimmed.eq_ignore_ascii_case("none")
}

/// Finds the processes of an installed package.
///
/// Uses `pidof <package>` with names from `ps -A`, and falls back to
/// filtering `ps -A` when `pidof` finds nothing.
pub fn find_processes_by_package(adb: &str, device: &str, package: &str) -> Vec<ProcessInfo> {
    let package = package.trim();
    if package.is_empty() {
        return Vec::new();
    }

    let names: HashMap<u32, String> = non_empty_stdout(shell(adb, device, "ps -A"))
        .map(|text| parse_ps_table(&text).into_iter().map(|p| (p.pid, p.name)).collect())
        .unwrap_or_default();

    if let Some(pids) = non_empty_stdout(shell(adb, device, &format!("pidof {package}"))) {
        return pids
            .split_whitespace()
            .filter_map(|pid| pid.parse::<u32>().ok())
            .map(|pid| {
                let name = names
                    .get(&pid)
                    .filter(|n| !n.is_empty())
                    .map_or(package, String::as_str);
                ProcessInfo::new(pid, name)
            })
            .collect();
    }

    non_empty_stdout(shell(adb, device, &format!("ps -A | grep {package}")))
        .map(|text| parse_ps_table(&text))
        .unwrap_or_default()
}

/// Parses `ps` output: the first numeric column is the PID, the last
/// column the name. Header lines are skipped.
pub fn parse_ps_table(text: &str) -> Vec<ProcessInfo> {
    text.lines().filter_map(parse_ps_line).collect()
}

fn parse_ps_line(line: &str) -> Option<ProcessInfo> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("USER") || trimmed.starts_with("UID") {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let pid = parts.iter().find_map(|p| p.parse::<u32>().ok())?;
    let name = parts.last()?;
    Some(ProcessInfo::new(pid, *name))
}

/// Checks whether the engine server is installed and running on a device.
pub fn check_server(adb: &str, device: &str) -> ServerStatus {
    let mut details = Vec::new();

    let mut running = false;
    if let Some(pid) = non_empty_stdout(shell(adb, device, &format!("pidof {SERVER_NAME}"))) {
        running = true;
        details.push(format!("{SERVER_NAME} pid: {pid}"));
    } else if let Some(ps) = non_empty_stdout(shell(adb, device, &format!("ps | grep {SERVER_NAME}"))) {
        running = true;
        details.push(format!("{SERVER_NAME} process: {ps}"));
    }

    let mut present =
        non_empty_stdout(shell(adb, device, &format!("ls {SERVER_DIR}/{SERVER_NAME}"))).is_some();
    if !present {
        let cmd = format!("ls {SERVER_DIR} | grep -E '^{SERVER_NAME}'");
        if let Some(variants) = non_empty_stdout(shell(adb, device, &cmd)) {
            present = true;
            details.push(format!("{SERVER_NAME} variants: {variants}"));
        }
    }
    if !present {
        details.push(format!(
            "{SERVER_NAME} not found in {SERVER_DIR} (expected {SERVER_NAME}*)."
        ));
    }

    debug!(device, present, running, "Checked engine server");
    ServerStatus {
        present,
        running,
        details: details.join("\n"),
    }
}

/// Trimmed stdout of a successful run, or `None` if it failed or printed nothing.
fn non_empty_stdout(result: Result<ProcessOutput, ProcessError>) -> Option<String> {
    match result {
        Ok(output) if output.success() => {
            let text = output.stdout.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "adb shell failed");
            None
        }
    }
}
