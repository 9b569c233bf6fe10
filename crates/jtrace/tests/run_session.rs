//! The `run` loop against fake engine executables.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use jtrace_cli::hooks::{add_hook, parse_signature};
use jtrace_cli::{run_session, RunOptions, RunOutcome, Workspace, WorkspaceState};
use jtrace_core::{HookSpec, ScriptOptions, SessionConfig};
use jtrace_engine::{ExitReason, Supervisor};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Engines {
    _dir: TempDir,
    echo: PathBuf,
    exits: PathBuf,
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Written once so no test executes a script another thread is writing.
fn engines() -> &'static Engines {
    static ENGINES: OnceLock<Engines> = OnceLock::new();
    ENGINES.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let echo = write_script(
            dir.path(),
            "frida-echo",
            "case \"$1\" in\n  --help) echo '--no-pause --auto-reload'; exit 0;;\n  --version) echo '16.1.0'; exit 0;;\nesac\n\
             echo '[Local::Example]-> [JTRACE] ready'\n\
             while IFS= read -r line; do :; done\n",
        );
        let exits = write_script(
            dir.path(),
            "frida-exits",
            "case \"$1\" in\n  --help) exit 0;;\n  --version) echo '16.1.0'; exit 0;;\nesac\nexit 3\n",
        );
        Engines {
            _dir: dir,
            echo,
            exits,
        }
    })
}

fn config(engine: &Path) -> SessionConfig {
    SessionConfig {
        engine_path: engine.to_string_lossy().into_owned(),
        target_package: "com.example.app".to_string(),
        ..SessionConfig::default()
    }
}

fn spec(signature: &str) -> HookSpec {
    HookSpec::new(parse_signature(signature, false).unwrap(), ScriptOptions::default())
}

async fn wait_for(lines: &Mutex<Vec<String>>, needle: &str) -> bool {
    for _ in 0..250 {
        if lines.lock().unwrap().iter().any(|l| l.contains(needle)) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_streams_log_and_reloads_on_workspace_change() {
    let engines = engines();
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path().join("hooks.json"));
    let mut state = WorkspaceState::default();
    add_hook(&mut state, spec("com.example.Api.first():void")).unwrap();
    workspace.save(&state).unwrap();

    let supervisor = Supervisor::default();
    let config = config(&engines.echo);
    let cancel = CancellationToken::new();
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_lines = Arc::clone(&lines);
    let options = RunOptions {
        watch: true,
        poll_interval: Duration::from_millis(50),
    };

    let session = run_session(&supervisor, &config, &workspace, options, cancel.clone(), move |line| {
        sink_lines.lock().unwrap().push(line.to_string());
    });

    let driver = async {
        assert!(wait_for(&lines, "[JTRACE] ready").await);
        let script = supervisor.script_path().unwrap();
        assert!(fs::read_to_string(&script).unwrap().contains("com.example.Api.first():void"));

        add_hook(&mut state, spec("com.example.Api.second(int):int")).unwrap();
        workspace.save(&state).unwrap();
        assert!(wait_for(&lines, "Script updated (2 active hooks).").await);
        assert_eq!(supervisor.script_path(), Some(script.clone()));
        assert!(fs::read_to_string(&script).unwrap().contains("com.example.Api.second(int):int"));

        cancel.cancel();
        script
    };

    let (outcome, script) = tokio::join!(session, driver);
    assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
    assert!(!script.exists());
    assert!(!supervisor.is_running());

    let lines = lines.lock().unwrap();
    assert!(lines[0].starts_with("Starting engine: "));
    assert!(lines[0].contains("--no-pause"));
    assert!(lines.contains(&"[Local::Example]->".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_returns_engine_exit() {
    let engines = engines();
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path().join("hooks.json"));

    let supervisor = Supervisor::default();
    let mut lines = Vec::new();
    let outcome = run_session(
        &supervisor,
        &config(&engines.exits),
        &workspace,
        RunOptions::default(),
        CancellationToken::new(),
        |line| lines.push(line.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(outcome, RunOutcome::Exited(ExitReason::ProcessExited { code: Some(3) }));
    assert_eq!(outcome.exit_code(), 3);
    assert!(lines.contains(&"No active hooks; starting with helpers only.".to_string()));
    assert!(lines.contains(&"Engine exited (code 3).".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_fails_for_missing_engine() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path().join("hooks.json"));
    let supervisor = Supervisor::default();

    let result = run_session(
        &supervisor,
        &config(Path::new("/definitely/not/here/frida")),
        &workspace,
        RunOptions::default(),
        CancellationToken::new(),
        |_| {},
    )
    .await;

    assert!(matches!(
        result,
        Err(jtrace_cli::CliError::Engine(jtrace_engine::EngineError::ExecutableNotFound { .. }))
    ));
}
