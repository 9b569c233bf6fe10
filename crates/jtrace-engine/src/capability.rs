//! Engine feature detection.
//!
//! Probing runs the engine twice (`--help`, `--version`) and is cached for
//! the last executable path seen. Every failure degrades to "unsupported".

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use jtrace_protocol::EngineVersion;
use tracing::{debug, warn};

use crate::command::{AUTO_RELOAD_FLAG, NO_PAUSE_FLAG};
use crate::process;

/// Timeout for each probe invocation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// What an engine executable supports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub supports_no_pause: bool,
    pub supports_auto_reload: bool,
    /// Trimmed `--version` output; empty if unavailable
    pub version: String,
}

/// Probes engine executables and remembers the result.
///
/// The cache holds one entry and is replaced whenever a different path
/// string is probed.
#[derive(Debug)]
pub struct CapabilityProber {
    cache: Mutex<Option<(String, Capabilities)>>,
    timeout: Duration,
}

impl Default for CapabilityProber {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProber {
    pub fn new() -> Self {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cache: Mutex::new(None),
            timeout,
        }
    }

    /// Returns the capabilities of `engine`, probing on first use.
    pub fn probe(&self, engine: &str) -> Capabilities {
        // Held across the probe so concurrent callers wait for one result.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((path, caps)) = cache.as_ref() {
            if path == engine {
                return caps.clone();
            }
        }

        let caps = self.detect(engine);
        debug!(
            engine,
            no_pause = caps.supports_no_pause,
            auto_reload = caps.supports_auto_reload,
            version = %caps.version,
            "Probed engine capabilities"
        );
        *cache = Some((engine.to_string(), caps.clone()));
        caps
    }

    /// Forgets the cached result.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn detect(&self, engine: &str) -> Capabilities {
        let help = match process::run(engine, ["--help"], self.timeout) {
            Ok(output) => output.combined(),
            Err(e) => {
                warn!(engine, error = %e, "Unable to read engine help");
                String::new()
            }
        };
        let version = engine_version(engine, self.timeout);

        let supports_auto_reload = help.contains(AUTO_RELOAD_FLAG)
            || EngineVersion::parse(&version)
                .map(|v| v.implies_auto_reload())
                .unwrap_or(false);

        Capabilities {
            supports_no_pause: help.contains(NO_PAUSE_FLAG),
            supports_auto_reload,
            version,
        }
    }
}

/// Runs `<engine> --version`; empty on any failure or non-zero exit.
pub fn engine_version(engine: &str, timeout: Duration) -> String {
    match process::run(engine, ["--version"], timeout) {
        Ok(output) if output.success() => output.stdout.trim().to_string(),
        Ok(output) => {
            debug!(engine, code = ?output.code, "Engine --version failed");
            String::new()
        }
        Err(e) => {
            debug!(engine, error = %e, "Engine --version failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_engine_is_unsupported() {
        let prober = CapabilityProber::with_timeout(Duration::from_millis(500));
        let caps = prober.probe("/definitely/not/here/frida");
        assert_eq!(caps, Capabilities::default());
    }

    #[test]
    fn test_missing_engine_version_is_empty() {
        assert_eq!(engine_version("/definitely/not/here/frida", Duration::from_millis(500)), "");
    }
}
