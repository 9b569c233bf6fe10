//! The custom (global) script list.
//!
//! Stored as newline-separated paths, each optionally prefixed with an
//! enabled marker: `1|` / `0|` or `[x]` / `[ ]`. Unprefixed lines are
//! enabled.

/// One entry of the custom script list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomScriptEntry {
    pub path: String,
    pub enabled: bool,
}

impl CustomScriptEntry {
    pub fn new(path: impl Into<String>, enabled: bool) -> Self {
        Self {
            path: path.into().trim().to_string(),
            enabled,
        }
    }
}

/// Parses the stored list. Blank lines and empty paths are skipped.
pub fn parse_custom_script_paths(raw: &str) -> Vec<CustomScriptEntry> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (enabled, path) = if let Some(rest) = line.strip_prefix("1|") {
                (true, rest)
            } else if let Some(rest) = line.strip_prefix("0|") {
                (false, rest)
            } else if let Some(rest) = line.strip_prefix("[x]") {
                (true, rest)
            } else if let Some(rest) = line.strip_prefix("[ ]") {
                (false, rest)
            } else {
                (true, line)
            };
            let path = path.trim();
            (!path.is_empty()).then(|| CustomScriptEntry::new(path, enabled))
        })
        .collect()
}

/// Formats entries back into the stored form using `1|` / `0|` markers.
pub fn format_custom_script_paths(entries: &[CustomScriptEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}|{}", if e.enabled { 1 } else { 0 }, e.path))
        .collect::<Vec<_>>()
        .join("\n")
}
