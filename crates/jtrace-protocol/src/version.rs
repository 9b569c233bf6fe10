//! Engine version strings.

use std::fmt;
use thiserror::Error;

/// First engine major version that reloads scripts on change.
pub const AUTO_RELOAD_MIN_MAJOR: u32 = 16;

/// Errors parsing an engine version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid engine version: {0:?}")]
    InvalidFormat(String),
}

/// Version reported by `<engine> --version`, e.g. `16.1.4`.
///
/// Missing minor/patch components parse as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a version string.
    ///
    /// Accepts a bare `major[.minor[.patch]]` and banner forms such as
    /// `Frida 16.1.4`, where everything but digits and dots is dropped.
    /// Trailing non-numeric suffixes on a component (`4-dev`) are ignored.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidFormat(s.to_string());

        let trimmed = s.trim();
        let cleaned: String = if trimmed.to_ascii_lowercase().starts_with("frida") {
            trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect()
        } else {
            trimmed.to_string()
        };

        let mut parts = cleaned.split('.');
        let major = parts
            .next()
            .and_then(leading_number)
            .ok_or_else(invalid)?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        let patch = parts.next().and_then(leading_number).unwrap_or(0);

        Ok(Self { major, minor, patch })
    }

    /// Returns the major version of `s`, or `None` if it cannot be parsed.
    pub fn parse_major(s: &str) -> Option<u32> {
        Self::parse(s).ok().map(|v| v.major)
    }

    /// Whether this release reloads scripts without an explicit flag check.
    pub fn implies_auto_reload(&self) -> bool {
        self.major >= AUTO_RELOAD_MIN_MAJOR
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
