//! Values reported by device and process discovery.

use std::fmt;

/// A process visible to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.pid, self.name)
    }
}

/// A device reported by the debug bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDevice {
    pub id: String,
    /// Bridge state, e.g. `device`, `offline`, `unauthorized`
    pub status: String,
    pub description: String,
}

impl fmt::Display for AdbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.trim();
        if !id.is_empty() {
            return f.write_str(id);
        }
        let description = self.description.trim();
        if !description.is_empty() {
            return f.write_str(description);
        }
        f.write_str(self.status.trim())
    }
}

/// Whether the engine's on-device server is installed and running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerStatus {
    pub present: bool,
    pub running: bool,
    /// Human-readable findings, one per line
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_display() {
        assert_eq!(ProcessInfo::new(42, "com.example.app").to_string(), "42  com.example.app");
    }

    #[test]
    fn test_device_display_fallbacks() {
        let device = AdbDevice {
            id: "emulator-5554".to_string(),
            status: "device".to_string(),
            description: "model:sdk".to_string(),
        };
        assert_eq!(device.to_string(), "emulator-5554");

        let device = AdbDevice {
            id: " ".to_string(),
            status: "offline".to_string(),
            description: String::new(),
        };
        assert_eq!(device.to_string(), "offline");
    }
}
