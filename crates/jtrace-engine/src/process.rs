//! Bounded-time execution of helper processes.
//!
//! All functions here block the calling thread until the child exits or
//! the timeout elapses; a timed-out child is killed and reaped.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::ProcessError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished helper process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, newline separated.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs `program args...` and waits at most `timeout`.
pub fn run<I, S>(program: &str, args: I, timeout: Duration) -> Result<ProcessOutput, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound(program.to_string())
            } else {
                ProcessError::Spawn {
                    program: program.to_string(),
                    source,
                }
            }
        })?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            debug!(program, timeout_ms = timeout.as_millis() as u64, "Helper process timed out");
            return Err(ProcessError::Timeout {
                millis: timeout.as_millis() as u64,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle
            .and_then(|h| h.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    };

    let output = ProcessOutput {
        code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    trace!(program, code = ?output.code, "Helper process finished");
    Ok(output)
}

/// Returns false only when `path` names a file location that does not exist.
///
/// Bare command names (no separator, no `.exe`) are assumed resolvable via
/// `PATH` and always pass. On a miss, `<path>.exe` is tried as well.
pub fn is_executable_available(path: &str) -> bool {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_ascii_lowercase();
    let looks_like_path = trimmed.contains('/') || trimmed.contains('\\') || lower.ends_with(".exe");
    if !looks_like_path {
        return true;
    }
    if Path::new(trimmed).exists() {
        return true;
    }
    !lower.ends_with(".exe") && Path::new(&format!("{trimmed}.exe")).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_names_are_available() {
        assert!(is_executable_available("frida"));
        assert!(!is_executable_available("  "));
    }

    #[test]
    fn test_missing_paths() {
        assert!(!is_executable_available("/definitely/not/here/frida"));
        assert!(!is_executable_available("C:\\tools\\frida.exe"));
    }

    #[test]
    fn test_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("engine");
        std::fs::write(&file, "").unwrap();
        assert!(is_executable_available(file.to_str().unwrap()));
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let err = run("/definitely/not/here/frida", ["--version"], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output() {
        let out = run("sh", ["-c", "echo out; echo err 1>&2; exit 3"], Duration::from_secs(5)).unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_times_out() {
        let started = Instant::now();
        let err = run("sh", ["-c", "sleep 5"], Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { millis: 200 }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
