//! User settings loaded from a TOML file.
//!
//! ```toml
//! [paths]
//! engine = "/opt/frida/bin/frida"
//! process_list = "frida-ps"
//! adb = "adb"
//! workspace = "~/work/hooks.json"
//!
//! [session]
//! device_mode = "usb"
//! target_package = "com.example.app"
//! spawn = true
//!
//! [stream]
//! termination_phrases = ["process terminated", "process crashed"]
//! ```
//!
//! Every table and key is optional. A missing default settings file means
//! defaults; a missing file named explicitly is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jtrace_core::SessionConfig;
use jtrace_protocol::StreamFilter;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, Result};

const APP_DIR: &str = "jtrace";
const SETTINGS_FILE: &str = "config.toml";
const WORKSPACE_FILE: &str = "hooks.json";

/// Executable and file locations. Empty values keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub engine: String,
    pub process_list: String,
    pub adb: String,
    pub workspace: String,
}

/// Parsed settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub session: SessionConfig,
    pub stream: StreamFilter,
}

impl Settings {
    /// Loads `explicit` if given, else the default location if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => match fs::read_to_string(path) {
                Ok(text) => Self::parse(path, &text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(CliError::SettingsNotFound(path.to_path_buf()))
                }
                Err(e) => Err(e.into()),
            },
            None => {
                let Some(path) = default_settings_path() else {
                    return Ok(Self::default());
                };
                match fs::read_to_string(&path) {
                    Ok(text) => Self::parse(&path, &text),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(path = %path.display(), "No settings file, using defaults");
                        Ok(Self::default())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(|source| CliError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Session defaults with `[paths]` applied on top.
    pub fn session_config(&self) -> SessionConfig {
        let mut config = self.session.clone();
        override_if_set(&mut config.engine_path, &self.paths.engine);
        override_if_set(&mut config.process_list_path, &self.paths.process_list);
        override_if_set(&mut config.adb_path, &self.paths.adb);
        config
    }

    /// Hook workspace file: `[paths] workspace`, else the state directory.
    pub fn workspace_path(&self) -> PathBuf {
        let configured = self.paths.workspace.trim();
        if configured.is_empty() {
            state_dir().join(WORKSPACE_FILE)
        } else {
            expand_home(configured)
        }
    }
}

fn override_if_set(target: &mut String, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        *target = value.to_string();
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// `<config dir>/jtrace/config.toml`, if the platform has a config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Per-user state directory for the workspace file and the log.
pub fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtrace_core::DeviceMode;

    #[test]
    fn test_empty_file_is_defaults() {
        let settings = Settings::parse(Path::new("x.toml"), "").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_paths_override_session() {
        let settings = Settings::parse(
            Path::new("x.toml"),
            r#"
            [paths]
            engine = "/opt/frida/bin/frida"
            adb = "  "

            [session]
            device_mode = "remote"
            remote_host = "10.0.0.5"
            target_package = "com.example.app"
            engine_path = "ignored"
            "#,
        )
        .unwrap();
        let config = settings.session_config();
        assert_eq!(config.engine_executable(), "/opt/frida/bin/frida");
        assert_eq!(config.adb_executable(), "adb");
        assert_eq!(config.device_mode, DeviceMode::Remote);
        assert_eq!(config.remote_address(), "10.0.0.5:27042");
        assert_eq!(config.target_package, "com.example.app");
    }

    #[test]
    fn test_stream_filter_partial_override() {
        let settings = Settings::parse(
            Path::new("x.toml"),
            r#"
            [stream]
            termination_phrases = ["target died"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.stream.termination_phrases, vec!["target died".to_string()]);
        assert_eq!(
            settings.stream.suppressed_stderr,
            StreamFilter::default().suppressed_stderr
        );
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let err = Settings::parse(Path::new("/etc/jtrace.toml"), "[session\n").unwrap_err();
        assert!(matches!(err, CliError::Settings { .. }));
        assert!(err.to_string().contains("/etc/jtrace.toml"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(CliError::SettingsNotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_explicit_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[paths]\nworkspace = \"/srv/hooks.json\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.workspace_path(), PathBuf::from("/srv/hooks.json"));
    }

    #[test]
    fn test_default_workspace_under_state_dir() {
        let settings = Settings::default();
        let path = settings.workspace_path();
        assert!(path.ends_with("jtrace/hooks.json"));
    }
}
