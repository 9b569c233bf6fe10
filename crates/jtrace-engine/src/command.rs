//! Engine command-line construction.
//!
//! Arguments are always passed to the OS as discrete strings; no shell is
//! involved. The only free-form field, `extra_engine_args`, is tokenized
//! here by [`split_args`].

use std::path::Path;

use jtrace_core::{DeviceMode, SessionConfig};

/// Flag that makes the engine resume a spawned target by itself.
pub const NO_PAUSE_FLAG: &str = "--no-pause";

/// Flag that makes the engine reload the script file when it changes.
pub const AUTO_RELOAD_FLAG: &str = "--auto-reload";

/// Device-selection flags: `-D <id>` or `-U` for USB, `-H host:port` for REMOTE.
pub fn device_args(config: &SessionConfig) -> Vec<String> {
    match config.device_mode {
        DeviceMode::Usb => {
            let id = config.device_id.trim();
            if id.is_empty() {
                vec!["-U".to_string()]
            } else {
                vec!["-D".to_string(), id.to_string()]
            }
        }
        DeviceMode::Remote => vec!["-H".to_string(), config.remote_address()],
    }
}

/// Feature flags chosen for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchFlags {
    pub no_pause: bool,
    pub auto_reload: bool,
}

/// Builds the full engine argument vector, executable first.
///
/// Layout: `<engine> <device> (-f <pkg> [--no-pause] | -p <pid> | -n <name>)
/// -l <script> [--auto-reload] [extra...]`. When attaching, the PID wins
/// over the process name, which wins over the package name.
pub fn build_command(config: &SessionConfig, script: &Path, flags: LaunchFlags) -> Vec<String> {
    let mut cmd = vec![config.engine_executable().to_string()];
    cmd.extend(device_args(config));

    if config.spawn {
        cmd.push("-f".to_string());
        cmd.push(config.target_package.trim().to_string());
        if flags.no_pause {
            cmd.push(NO_PAUSE_FLAG.to_string());
        }
    } else {
        match config.target_pid.filter(|pid| *pid > 0) {
            Some(pid) => {
                cmd.push("-p".to_string());
                cmd.push(pid.to_string());
            }
            None => {
                let process = config.target_process.trim();
                let name = if process.is_empty() {
                    config.target_package.trim()
                } else {
                    process
                };
                cmd.push("-n".to_string());
                cmd.push(name.to_string());
            }
        }
    }

    cmd.push("-l".to_string());
    cmd.push(absolute(script));
    if flags.auto_reload {
        cmd.push(AUTO_RELOAD_FLAG.to_string());
    }
    cmd.extend(split_args(&config.extra_engine_args));
    cmd
}

fn absolute(path: &Path) -> String {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    resolved.to_string_lossy().into_owned()
}

/// Tokenizes a user-supplied argument string.
///
/// Whitespace separates tokens outside quotes. Single or double quotes
/// group text; inside quotes a backslash escapes the active quote
/// character or another backslash and is literal otherwise. An
/// unterminated quote runs to the end of the input.
pub fn split_args(extra: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = extra.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(q) if c == '\\' => match chars.peek() {
                Some(&next) if next == q || next == '\\' => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(c),
            },
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spawn_config(package: &str) -> SessionConfig {
        SessionConfig {
            target_package: package.to_string(),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_split_args_basic() {
        assert_eq!(split_args("  --a  b\tc "), vec!["--a", "b", "c"]);
        assert!(split_args("   ").is_empty());
        assert!(split_args("").is_empty());
    }

    #[test]
    fn test_split_args_quotes() {
        assert_eq!(
            split_args(r#"--x "hello world" 'it''s'"#),
            vec!["--x", "hello world", "its"]
        );
        assert_eq!(split_args(r#""a \"b\" \\ \n""#), vec![r#"a "b" \ \n"#]);
        assert_eq!(split_args(r#"'single \' quote'"#), vec!["single ' quote"]);
        assert_eq!(split_args(r#"outside\ backslash"#), vec![r"outside\", "backslash"]);
        assert_eq!(split_args(r#""unterminated rest"#), vec!["unterminated rest"]);
        // Quotes alone produce no token.
        assert!(split_args(r#""""#).is_empty());
    }

    #[test]
    fn test_device_args() {
        let mut config = SessionConfig::default();
        assert_eq!(device_args(&config), vec!["-U"]);
        config.device_id = "emulator-5554".to_string();
        assert_eq!(device_args(&config), vec!["-D", "emulator-5554"]);
        config.device_mode = DeviceMode::Remote;
        assert_eq!(device_args(&config), vec!["-H", "127.0.0.1:27042"]);
    }

    #[test]
    fn test_spawn_command() {
        let script = PathBuf::from("/tmp/s.js");
        let cmd = build_command(
            &spawn_config("com.example.app"),
            &script,
            LaunchFlags { no_pause: true, auto_reload: true },
        );
        assert_eq!(
            cmd,
            vec!["frida", "-U", "-f", "com.example.app", "--no-pause", "-l", "/tmp/s.js", "--auto-reload"]
        );

        let cmd = build_command(&spawn_config("com.example.app"), &script, LaunchFlags::default());
        assert_eq!(cmd, vec!["frida", "-U", "-f", "com.example.app", "-l", "/tmp/s.js"]);
    }

    #[test]
    fn test_attach_precedence() {
        let script = PathBuf::from("/tmp/s.js");
        let mut config = SessionConfig {
            spawn: false,
            ..spawn_config("com.example.app")
        };
        let flags = LaunchFlags { no_pause: true, auto_reload: false };

        let cmd = build_command(&config, &script, flags);
        assert_eq!(&cmd[2..4], ["-n", "com.example.app"]);
        assert!(!cmd.contains(&NO_PAUSE_FLAG.to_string()));

        config.target_process = "Example".to_string();
        let cmd = build_command(&config, &script, flags);
        assert_eq!(&cmd[2..4], ["-n", "Example"]);

        config.target_pid = Some(4242);
        let cmd = build_command(&config, &script, flags);
        assert_eq!(&cmd[2..4], ["-p", "4242"]);
    }

    #[test]
    fn test_extra_args_appended() {
        let config = SessionConfig {
            extra_engine_args: r#"--runtime=v8 -o "/tmp/out log.txt""#.to_string(),
            engine_path: "/opt/frida/bin/frida".to_string(),
            ..spawn_config("com.example.app")
        };
        let cmd = build_command(&config, Path::new("/tmp/s.js"), LaunchFlags::default());
        assert_eq!(cmd.first().map(String::as_str), Some("/opt/frida/bin/frida"));
        assert_eq!(&cmd[cmd.len() - 3..], ["--runtime=v8", "-o", "/tmp/out log.txt"]);
    }
}
