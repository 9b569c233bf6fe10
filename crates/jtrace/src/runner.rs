//! The `run` loop: one engine session fed from the hook workspace.
//!
//! The supervisor works on OS threads and reports through two callbacks.
//! Both are bridged into one unbounded channel, and the loop selects over
//! that channel, the cancellation token and a workspace poll tick:
//!
//! ```text
//! engine threads ──log/exit──▶ mpsc ──┐
//! cancel token ───────────────────────┼──▶ select! loop ──▶ output sink
//! poll tick (workspace changed?) ─────┘         │
//!                                               └──▶ Supervisor::apply
//! ```
//!
//! Blocking supervisor calls (probing, launching) run on the blocking pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use jtrace_core::SessionConfig;
use jtrace_engine::{ApplyOutcome, ExitReason, LogSink, Supervisor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};
use crate::workspace::{collect_globals, Workspace, WorkspaceState};

/// How often the workspace file is checked for changes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Events forwarded from the supervisor's threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Log(String),
    Exited(ExitReason),
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Reload the script when the workspace file changes
    pub watch: bool,
    pub poll_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            watch: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine session ended by itself
    Exited(ExitReason),
    /// The token was cancelled (Ctrl-C)
    Cancelled,
}

impl RunOutcome {
    /// Process exit status for the front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Exited(reason) => reason.code(),
            RunOutcome::Cancelled => 0,
        }
    }
}

/// Compiles the program for the active hooks and enabled custom scripts.
pub fn compile_program(
    state: &WorkspaceState,
    reported: &mut HashSet<String>,
    report: impl FnMut(&str),
) -> String {
    let globals = collect_globals(&state.custom_scripts, reported, report);
    jtrace_script::compile(state.registry.active_specs(), &globals)
}

/// Runs one session until it exits or `cancel` fires.
///
/// Every engine line and status notice goes to `out`. The session is
/// stopped before returning.
pub async fn run_session(
    supervisor: &Supervisor,
    config: &SessionConfig,
    workspace: &Workspace,
    options: RunOptions,
    cancel: CancellationToken,
    mut out: impl FnMut(&str),
) -> Result<RunOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
    let exit_tx = tx.clone();
    supervisor.set_on_exit(move |reason| {
        let _ = exit_tx.send(SessionEvent::Exited(reason));
    });
    let log_tx = tx;
    let sink: LogSink = Arc::new(move |line: &str| {
        let _ = log_tx.send(SessionEvent::Log(line.to_string()));
    });

    let mut reported = HashSet::new();
    let state = workspace.load()?;
    let mut fingerprint = workspace.fingerprint();
    let program = compile_program(&state, &mut reported, &mut out);
    info!(
        hooks = state.registry.active_specs().len(),
        bytes = program.len(),
        "Starting session"
    );
    if state.registry.active_specs().is_empty() {
        out("No active hooks; starting with helpers only.");
    }
    blocking_apply(supervisor, config, program, sink.clone()).await?;

    let mut tick = tokio::time::interval(options.poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Session cancelled");
                break RunOutcome::Cancelled;
            }
            event = rx.recv() => match event {
                Some(SessionEvent::Log(line)) => out(&line),
                Some(SessionEvent::Exited(reason)) => {
                    out(&format!("Engine exited (code {}).", reason.code()));
                    break RunOutcome::Exited(reason);
                }
                None => {
                    warn!("Session event channel closed");
                    break RunOutcome::Cancelled;
                }
            },
            _ = tick.tick(), if options.watch => {
                let current = workspace.fingerprint();
                if current == fingerprint {
                    continue;
                }
                fingerprint = current;
                debug!(path = %workspace.path().display(), "Workspace changed");
                match reload(supervisor, config, workspace, &mut reported, &mut out, sink.clone()).await {
                    Ok(message) => out(&message),
                    Err(e) => {
                        warn!(error = %e, "Reload failed");
                        out(&format!("Reload failed: {e}"));
                    }
                }
            }
        }
    };

    let stopper = supervisor.clone();
    // Stop on the blocking pool: termination closes pipes and signals.
    let _ = tokio::task::spawn_blocking(move || stopper.stop()).await;
    Ok(outcome)
}

async fn reload(
    supervisor: &Supervisor,
    config: &SessionConfig,
    workspace: &Workspace,
    reported: &mut HashSet<String>,
    out: &mut impl FnMut(&str),
    sink: LogSink,
) -> Result<String> {
    let state = workspace.load()?;
    let active = state.registry.active_specs().len();
    let program = compile_program(&state, reported, out);
    let message = match blocking_apply(supervisor, config, program, sink).await? {
        ApplyOutcome::Reloaded if supervisor.auto_reload_enabled() => {
            format!("Script updated ({active} active hooks).")
        }
        ApplyOutcome::Reloaded => {
            format!("Script file updated ({active} active hooks); engine has no auto-reload, restart to apply.")
        }
        ApplyOutcome::Unchanged => "Script unchanged.".to_string(),
        ApplyOutcome::Started => format!("Session restarted ({active} active hooks)."),
    };
    Ok(message)
}

async fn blocking_apply(
    supervisor: &Supervisor,
    config: &SessionConfig,
    program: String,
    sink: LogSink,
) -> Result<ApplyOutcome> {
    let (supervisor, config) = (supervisor.clone(), config.clone());
    tokio::task::spawn_blocking(move || supervisor.apply(&config, &program, sink))
        .await
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?
        .map_err(CliError::from)
}
