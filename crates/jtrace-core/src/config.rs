//! Session configuration: which device, which process, which executables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default engine executable name.
pub const DEFAULT_ENGINE: &str = "frida";
/// Default process-list executable name.
pub const DEFAULT_PROCESS_LIST: &str = "frida-ps";
/// Default debug-bridge executable name.
pub const DEFAULT_ADB: &str = "adb";
/// Default remote engine server address.
pub const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";
/// Default remote engine server port.
pub const DEFAULT_REMOTE_PORT: u16 = 27042;

/// How the engine reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// USB-attached device, optionally selected by id
    #[default]
    Usb,
    /// Engine server reachable over the network
    Remote,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usb => write!(f, "USB"),
            Self::Remote => write!(f, "REMOTE"),
        }
    }
}

/// The process a session addresses, after applying precedence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetIdentity<'a> {
    Pid(u32),
    Process(&'a str),
    Package(&'a str),
}

/// Everything needed to launch an engine session.
///
/// Owned and mutated by the caller; the supervisor only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub device_mode: DeviceMode,
    /// USB device serial; empty selects the only USB device
    pub device_id: String,
    pub remote_host: String,
    pub remote_port: u16,
    /// Spawn the package (true) or attach to a running process (false)
    pub spawn: bool,
    pub target_package: String,
    pub target_process: String,
    /// Attach by PID; `None` or `0` means unset
    pub target_pid: Option<u32>,
    /// Extra engine arguments, tokenized with shell-style quoting
    pub extra_engine_args: String,
    pub engine_path: String,
    pub process_list_path: String,
    pub adb_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_mode: DeviceMode::Usb,
            device_id: String::new(),
            remote_host: DEFAULT_REMOTE_HOST.to_string(),
            remote_port: DEFAULT_REMOTE_PORT,
            spawn: true,
            target_package: String::new(),
            target_process: String::new(),
            target_pid: None,
            extra_engine_args: String::new(),
            engine_path: DEFAULT_ENGINE.to_string(),
            process_list_path: DEFAULT_PROCESS_LIST.to_string(),
            adb_path: DEFAULT_ADB.to_string(),
        }
    }
}

impl SessionConfig {
    /// The authoritative target: PID, else process name, else package.
    pub fn target_identity(&self) -> TargetIdentity<'_> {
        if let Some(pid) = self.target_pid.filter(|pid| *pid > 0) {
            return TargetIdentity::Pid(pid);
        }
        let process = self.target_process.trim();
        if !process.is_empty() {
            return TargetIdentity::Process(process);
        }
        TargetIdentity::Package(self.target_package.trim())
    }

    /// `host:port` of the remote engine server.
    pub fn remote_address(&self) -> String {
        format!("{}:{}", self.remote_host.trim(), self.remote_port)
    }

    /// Engine executable, falling back to the bare default name.
    pub fn engine_executable(&self) -> &str {
        non_empty_or(&self.engine_path, DEFAULT_ENGINE)
    }

    /// Process-list executable, falling back to the bare default name.
    pub fn process_list_executable(&self) -> &str {
        non_empty_or(&self.process_list_path, DEFAULT_PROCESS_LIST)
    }

    /// Debug-bridge executable, falling back to the bare default name.
    pub fn adb_executable(&self) -> &str {
        non_empty_or(&self.adb_path, DEFAULT_ADB)
    }

    /// Returns true if a running session for `other` can be reused for `self`.
    ///
    /// Device mode, device identity (id for USB, address for REMOTE),
    /// spawn/attach and the resolved target must all match. The relation
    /// is reflexive and symmetric.
    pub fn is_compatible_for_reuse(&self, other: &SessionConfig) -> bool {
        if self.device_mode != other.device_mode || self.spawn != other.spawn {
            return false;
        }
        let same_device = match self.device_mode {
            DeviceMode::Usb => self.device_id.trim() == other.device_id.trim(),
            DeviceMode::Remote => self.remote_address() == other.remote_address(),
        };
        same_device && self.target_identity() == other.target_identity()
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(package: &str) -> SessionConfig {
        SessionConfig {
            target_package: package.to_string(),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.device_mode, DeviceMode::Usb);
        assert!(config.spawn);
        assert_eq!(config.remote_address(), "127.0.0.1:27042");
        assert_eq!(config.engine_executable(), "frida");
        assert_eq!(config.process_list_executable(), "frida-ps");
        assert_eq!(config.adb_executable(), "adb");
    }

    #[test]
    fn test_executable_fallback() {
        let config = SessionConfig {
            engine_path: "   ".to_string(),
            ..SessionConfig::default()
        };
        assert_eq!(config.engine_executable(), "frida");
    }

    #[test]
    fn test_target_precedence() {
        let mut config = usb("com.example.app");
        assert_eq!(config.target_identity(), TargetIdentity::Package("com.example.app"));

        config.target_process = "Example".to_string();
        assert_eq!(config.target_identity(), TargetIdentity::Process("Example"));

        config.target_pid = Some(0);
        assert_eq!(config.target_identity(), TargetIdentity::Process("Example"));

        config.target_pid = Some(1234);
        assert_eq!(config.target_identity(), TargetIdentity::Pid(1234));
    }

    #[test]
    fn test_reuse_reflexive_and_symmetric() {
        let a = usb("com.example.app");
        let mut b = usb("com.example.app");
        b.target_pid = Some(42);

        assert!(a.is_compatible_for_reuse(&a));
        assert!(b.is_compatible_for_reuse(&b));
        assert_eq!(a.is_compatible_for_reuse(&b), b.is_compatible_for_reuse(&a));
        assert!(!a.is_compatible_for_reuse(&b));
    }

    #[test]
    fn test_reuse_requires_same_spawn_mode() {
        let a = usb("com.example.app");
        let b = SessionConfig {
            spawn: false,
            ..usb("com.example.app")
        };
        assert!(!a.is_compatible_for_reuse(&b));
    }

    #[test]
    fn test_usb_ignores_remote_fields() {
        let a = usb("com.example.app");
        let b = SessionConfig {
            remote_host: "10.0.0.2".to_string(),
            remote_port: 1,
            ..usb("com.example.app")
        };
        assert!(a.is_compatible_for_reuse(&b));

        let c = SessionConfig {
            device_id: "emulator-5554".to_string(),
            ..usb("com.example.app")
        };
        assert!(!a.is_compatible_for_reuse(&c));
    }

    #[test]
    fn test_remote_ignores_device_id() {
        let a = SessionConfig {
            device_mode: DeviceMode::Remote,
            device_id: "x".to_string(),
            ..usb("com.example.app")
        };
        let b = SessionConfig {
            device_id: "y".to_string(),
            ..a.clone()
        };
        assert!(a.is_compatible_for_reuse(&b));

        let c = SessionConfig {
            remote_port: 9999,
            ..a.clone()
        };
        assert!(!a.is_compatible_for_reuse(&c));
    }

    #[test]
    fn test_toml_partial_config() {
        let config: SessionConfig = toml::from_str(
            r#"
            device_mode = "remote"
            remote_host = "192.168.1.20"
            target_package = "com.example.app"
            "#,
        )
        .unwrap();
        assert_eq!(config.device_mode, DeviceMode::Remote);
        assert_eq!(config.remote_address(), "192.168.1.20:27042");
        assert!(config.spawn);
        assert_eq!(config.engine_executable(), "frida");
    }
}
