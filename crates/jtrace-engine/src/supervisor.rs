//! Engine session supervision.
//!
//! A [`Supervisor`] owns at most one running engine process:
//!
//! ```text
//! Stopped ──start──▶ Running ──update_script──▶ Running
//!    ▲                  │
//!    └──stop / exit─────┘
//! ```
//!
//! Each session runs a stdout reader, a stderr reader and an exit waiter
//! on their own threads, plus a delayed resume sender when a spawned
//! target must be resumed by hand. Three things can end a session: an
//! explicit [`Supervisor::stop`], the engine process exiting, or a
//! termination phrase in the engine's output while the process is still
//! alive. All three race for a per-session latch, so the exit callback
//! fires exactly once per session.
//!
//! # Panic-Free Guarantees
//!
//! Lock poisoning is recovered from rather than propagated; background
//! threads never unwrap.

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use jtrace_core::{ProcessInfo, SessionConfig};
use jtrace_protocol::{StreamFilter, StreamKind};
use tracing::{debug, info, trace, warn};

use crate::capability::{self, Capabilities, CapabilityProber, PROBE_TIMEOUT};
use crate::command::{build_command, LaunchFlags};
use crate::error::{EngineError, Result};
use crate::process;
use crate::processes;

/// Delay before resuming a spawned target when the engine cannot do it.
pub const RESUME_DELAY: Duration = Duration::from_millis(500);

/// Interactive command that resumes a spawned target.
pub const RESUME_COMMAND: &str = "%resume";

const SCRIPT_PREFIX: &str = "jtrace-session-";
const SCRIPT_SUFFIX: &str = ".js";

/// Receives every classified engine output line and lifecycle notice.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives the single end-of-session notification.
pub type ExitCallback = Arc<dyn Fn(ExitReason) + Send + Sync>;

// ============================================================================
// Public Types
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// [`Supervisor::stop`] was called (or a new session replaced this one)
    Stopped,
    /// The engine process exited; `None` when killed by a signal
    ProcessExited { code: Option<i32> },
    /// The engine reported the target gone while still running
    SessionTerminated { code: i32 },
}

impl ExitReason {
    /// Status code for display: 0 for a requested stop, -1 when unknown.
    pub fn code(&self) -> i32 {
        match self {
            ExitReason::Stopped => 0,
            ExitReason::ProcessExited { code } => code.unwrap_or(-1),
            ExitReason::SessionTerminated { code } => *code,
        }
    }
}

/// What [`Supervisor::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new engine process was launched
    Started,
    /// The running session's script was rewritten
    Reloaded,
    /// The running session already had this script
    Unchanged,
}

// ============================================================================
// Internal State
// ============================================================================

/// One-shot flag: the first `try_fire` wins.
#[derive(Debug, Default)]
struct ExitLatch(AtomicBool);

impl ExitLatch {
    fn try_fire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Handle to the live engine process. The `Child` itself is owned by the
/// exit waiter thread.
struct EngineProcess {
    pid: u32,
    alive: Arc<AtomicBool>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    latch: Arc<ExitLatch>,
}

impl EngineProcess {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Closes stdin and asks the process to exit. Best effort.
    fn terminate(&self) {
        lock(&self.stdin).take();
        if self.is_alive() {
            debug!(pid = self.pid, "Terminating engine process");
            send_terminate(self.pid);
        }
    }
}

#[derive(Default)]
struct SessionState {
    process: Option<EngineProcess>,
    script_path: Option<PathBuf>,
    last_script: Option<String>,
    auto_reload: bool,
    temp_scripts: Vec<PathBuf>,
    active_config: Option<SessionConfig>,
    /// Bumped on every launch; background threads only act on their own session
    generation: u64,
}

impl SessionState {
    fn is_running(&self) -> bool {
        self.process.as_ref().is_some_and(EngineProcess::is_alive)
    }

    /// Ends the current session, returning its latch if a process existed.
    fn teardown(&mut self) -> Option<Arc<ExitLatch>> {
        let latch = self.process.take().map(|p| {
            p.terminate();
            p.latch
        });
        self.script_path = None;
        self.last_script = None;
        self.auto_reload = false;
        self.active_config = None;
        for path in self.temp_scripts.drain(..) {
            remove_script(&path);
        }
        latch
    }
}

/// Everything a launch needs that can be computed before taking the lock.
struct PreparedLaunch {
    engine: String,
    script_path: PathBuf,
    flags: LaunchFlags,
    command: Vec<String>,
    command_line: String,
}

struct Shared {
    state: Mutex<SessionState>,
    on_exit: Mutex<Option<ExitCallback>>,
    prober: CapabilityProber,
    filter: Arc<StreamFilter>,
    resume_delay: Duration,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    /// Fires the exit callback if `latch` has not fired yet.
    ///
    /// Must be called without the state lock held.
    fn notify_exit(&self, latch: &ExitLatch, reason: ExitReason) -> bool {
        if !latch.try_fire() {
            trace!(?reason, "Exit already notified");
            return false;
        }
        info!(?reason, code = reason.code(), "Engine session ended");
        let callback = lock(&self.on_exit).clone();
        if let Some(callback) = callback {
            callback(reason);
        }
        true
    }

    /// Stops the session, or only the given generation when `Some`.
    fn stop_session(&self, generation: Option<u64>) {
        let latch = {
            let mut state = self.state();
            if generation.is_some_and(|g| g != state.generation) {
                return;
            }
            state.teardown()
        };
        if let Some(latch) = latch {
            self.notify_exit(&latch, ExitReason::Stopped);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.teardown();
    }
}

/// What the background threads of one session share.
#[derive(Clone)]
struct SessionContext {
    shared: Weak<Shared>,
    generation: u64,
    latch: Arc<ExitLatch>,
    log: LogSink,
}

impl SessionContext {
    fn emit(&self, line: &str) {
        (self.log)(line);
    }

    fn process_exited(&self, code: Option<i32>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.notify_exit(&self.latch, ExitReason::ProcessExited { code });
        }
    }

    /// The engine reported the target gone: notify, then release resources.
    fn session_terminated(&self, code: i32) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if shared.notify_exit(&self.latch, ExitReason::SessionTerminated { code }) {
            shared.stop_session(Some(self.generation));
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Supervises engine sessions. Cheap to clone; clones share one session.
///
/// `start`, `stop` and `update_script` are serialized by a single lock.
/// The exit callback and the log sink are always invoked without that
/// lock held, so they may call back into the supervisor.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(StreamFilter::default())
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("Supervisor")
            .field("running", &state.is_running())
            .field("script_path", &state.script_path)
            .field("generation", &state.generation)
            .finish()
    }
}

impl Supervisor {
    /// Creates a supervisor classifying engine output with `filter`.
    pub fn new(filter: StreamFilter) -> Self {
        Self::with_resume_delay(filter, RESUME_DELAY)
    }

    /// Like [`Supervisor::new`] with a custom delay before `%resume`.
    pub fn with_resume_delay(filter: StreamFilter, resume_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                on_exit: Mutex::new(None),
                prober: CapabilityProber::new(),
                filter: Arc::new(filter),
                resume_delay,
            }),
        }
    }

    /// Sets the callback fired once when a session ends.
    pub fn set_on_exit(&self, callback: impl Fn(ExitReason) + Send + Sync + 'static) {
        *lock(&self.shared.on_exit) = Some(Arc::new(callback));
    }

    /// Starts a session running `script`, replacing any existing session.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ExecutableNotFound`] if the engine path names a
    ///   missing file
    /// - [`EngineError::Io`] if the script file cannot be written
    /// - [`EngineError::Launch`] if the process cannot be started
    pub fn start(&self, config: &SessionConfig, script: &str, log: LogSink) -> Result<()> {
        let launch = match self.prepare(config, script) {
            Ok(launch) => launch,
            Err(e) => {
                let previous = self.shared.state().teardown();
                if let Some(latch) = previous {
                    self.shared.notify_exit(&latch, ExitReason::Stopped);
                }
                return Err(e);
            }
        };
        log(&format!("Starting engine: {}", launch.command_line));

        let (previous, result) = {
            let mut state = self.shared.state();
            let previous = state.teardown();
            let result = self.launch(&mut state, config, script, launch, log);
            (previous, result)
        };
        if let Some(latch) = previous {
            self.shared.notify_exit(&latch, ExitReason::Stopped);
        }
        result
    }

    /// Rewrites the session script. Returns `Ok(false)` when `script` is
    /// identical to the last write, which is then skipped.
    ///
    /// Whether the engine picks the change up depends on auto-reload
    /// support; this is not re-checked here.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoActiveSession`] if no session script exists.
    pub fn update_script(&self, script: &str) -> Result<bool> {
        let mut state = self.shared.state();
        let Some(path) = state.script_path.clone() else {
            return Err(EngineError::NoActiveSession);
        };
        if state.last_script.as_deref() == Some(script) {
            trace!(path = %path.display(), "Session script unchanged");
            return Ok(false);
        }
        fs::write(&path, script)?;
        state.last_script = Some(script.to_string());
        debug!(
            path = %path.display(),
            bytes = script.len(),
            auto_reload = state.auto_reload,
            "Session script updated"
        );
        Ok(true)
    }

    /// Reuses the running session when `config` is compatible with it,
    /// otherwise starts a new one.
    pub fn apply(&self, config: &SessionConfig, script: &str, log: LogSink) -> Result<ApplyOutcome> {
        let reusable = {
            let state = self.shared.state();
            state.is_running()
                && state
                    .active_config
                    .as_ref()
                    .is_some_and(|active| active.is_compatible_for_reuse(config))
        };
        if reusable {
            match self.update_script(script) {
                Ok(true) => return Ok(ApplyOutcome::Reloaded),
                Ok(false) => return Ok(ApplyOutcome::Unchanged),
                // The session ended in between; fall through to a fresh start.
                Err(EngineError::NoActiveSession) => {}
                Err(e) => return Err(e),
            }
        }
        self.start(config, script, log)?;
        Ok(ApplyOutcome::Started)
    }

    /// Stops the session and deletes its script files. Idempotent.
    pub fn stop(&self) {
        self.shared.stop_session(None);
    }

    /// True while an engine process exists and has not exited.
    pub fn is_running(&self) -> bool {
        self.shared.state().is_running()
    }

    /// Path of the live session script, if any.
    pub fn script_path(&self) -> Option<PathBuf> {
        self.shared.state().script_path.clone()
    }

    /// Whether the session was launched with auto-reload.
    pub fn auto_reload_enabled(&self) -> bool {
        self.shared.state().auto_reload
    }

    /// Configuration of the current session.
    pub fn active_config(&self) -> Option<SessionConfig> {
        self.shared.state().active_config.clone()
    }

    /// Capabilities of an engine executable (cached per path).
    pub fn capabilities(&self, engine: &str) -> Capabilities {
        self.shared.prober.probe(engine)
    }

    /// `<engine> --version`, or empty on failure.
    pub fn engine_version(&self, engine: &str) -> String {
        capability::engine_version(engine, PROBE_TIMEOUT)
    }

    /// Lists processes on the configured device; empty on failure.
    pub fn list_processes(&self, config: &SessionConfig) -> Vec<ProcessInfo> {
        processes::list_processes(config)
    }

    // ------------------------------------------------------------------------
    // Launch
    // ------------------------------------------------------------------------

    /// Checks the engine, writes the script file and builds the command.
    /// Runs without the state lock; probing may take seconds.
    fn prepare(&self, config: &SessionConfig, script: &str) -> Result<PreparedLaunch> {
        let engine = config.engine_executable().to_string();
        if !process::is_executable_available(&engine) {
            warn!(engine = %engine, "Engine executable not found");
            return Err(EngineError::ExecutableNotFound { path: engine });
        }

        let caps = self.shared.prober.probe(&engine);
        let flags = LaunchFlags {
            no_pause: config.spawn && caps.supports_no_pause,
            auto_reload: caps.supports_auto_reload,
        };
        let script_path = create_script_file(script)?;
        let command = build_command(config, &script_path, flags);
        let command_line = command.join(" ");
        Ok(PreparedLaunch {
            engine,
            script_path,
            flags,
            command,
            command_line,
        })
    }

    fn launch(
        &self,
        state: &mut SessionState,
        config: &SessionConfig,
        script: &str,
        launch: PreparedLaunch,
        log: LogSink,
    ) -> Result<()> {
        let PreparedLaunch {
            engine,
            script_path,
            flags,
            command,
            command_line,
        } = launch;
        state.temp_scripts.push(script_path.clone());
        info!(command = %command_line, spawn = config.spawn, "Starting engine session");

        let Some((program, args)) = command.split_first() else {
            state.teardown();
            return Err(EngineError::ExecutableNotFound { path: engine });
        };
        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                state.teardown();
                return Err(EngineError::Launch {
                    command: command_line,
                    source,
                });
            }
        };

        let pid = child.id();
        state.generation += 1;
        let latch = Arc::new(ExitLatch::default());
        let alive = Arc::new(AtomicBool::new(true));
        let stdin = Arc::new(Mutex::new(child.stdin.take()));
        let ctx = SessionContext {
            shared: Arc::downgrade(&self.shared),
            generation: state.generation,
            latch: Arc::clone(&latch),
            log,
        };

        let needs_resume = config.spawn && !flags.no_pause;
        if let Err(e) = self.spawn_session_threads(&ctx, child, &alive, &stdin, needs_resume) {
            state.teardown();
            return Err(EngineError::Io(e));
        }

        info!(pid, generation = state.generation, auto_reload = flags.auto_reload, "Engine session started");
        state.process = Some(EngineProcess {
            pid,
            alive,
            stdin,
            latch,
        });
        state.script_path = Some(script_path);
        state.last_script = Some(script.to_string());
        state.auto_reload = flags.auto_reload;
        state.active_config = Some(config.clone());
        Ok(())
    }

    /// Starts readers, the resume sender if needed, and finally the exit
    /// waiter, which takes ownership of the child. On failure the child is
    /// terminated.
    fn spawn_session_threads(
        &self,
        ctx: &SessionContext,
        mut child: Child,
        alive: &Arc<AtomicBool>,
        stdin: &Arc<Mutex<Option<ChildStdin>>>,
        needs_resume: bool,
    ) -> io::Result<()> {
        if let Err(e) = self.spawn_io_threads(ctx, &mut child, stdin, needs_resume) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let pid = child.id();
        let (ctx, alive) = (ctx.clone(), Arc::clone(alive));
        spawn_named("jtrace-exit", move || wait_for_exit(&ctx, child, &alive)).map_err(|e| {
            send_terminate(pid);
            e
        })
    }

    fn spawn_io_threads(
        &self,
        ctx: &SessionContext,
        child: &mut Child,
        stdin: &Arc<Mutex<Option<ChildStdin>>>,
        needs_resume: bool,
    ) -> io::Result<()> {
        if let Some(stdout) = child.stdout.take() {
            let (ctx, filter) = (ctx.clone(), Arc::clone(&self.shared.filter));
            spawn_named("jtrace-stdout", move || {
                read_stream(&ctx, &filter, stdout, StreamKind::Stdout)
            })?;
        }
        if let Some(stderr) = child.stderr.take() {
            let (ctx, filter) = (ctx.clone(), Arc::clone(&self.shared.filter));
            spawn_named("jtrace-stderr", move || {
                read_stream(&ctx, &filter, stderr, StreamKind::Stderr)
            })?;
        }
        if needs_resume {
            let (ctx, stdin, delay) = (ctx.clone(), Arc::clone(stdin), self.shared.resume_delay);
            spawn_named("jtrace-resume", move || send_resume(&ctx, &stdin, delay))?;
        }
        Ok(())
    }
}

// ============================================================================
// Background Threads
// ============================================================================

fn spawn_named(name: &str, f: impl FnOnce() + Send + 'static) -> io::Result<()> {
    thread::Builder::new().name(name.to_string()).spawn(f).map(|_| ())
}

/// Forwards one engine stream, line by line, through the filter.
fn read_stream(ctx: &SessionContext, filter: &StreamFilter, stream: impl Read, kind: StreamKind) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
                let classified = filter.classify(kind, line);
                for out in &classified.lines {
                    ctx.emit(out);
                }
                if let Some(event) = classified.event {
                    debug!(?kind, ?event, "Termination detected in engine output");
                    ctx.session_terminated(event.exit_code());
                }
            }
            Err(e) => {
                trace!(?kind, error = %e, "Engine stream read failed");
                break;
            }
        }
    }
    trace!(?kind, "Engine stream closed");
}

fn wait_for_exit(ctx: &SessionContext, mut child: Child, alive: &AtomicBool) {
    let code = match child.wait() {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "Waiting for engine process failed");
            None
        }
    };
    alive.store(false, Ordering::Release);
    info!(pid = child.id(), code = ?code, "Engine process exited");
    ctx.process_exited(code);
}

fn send_resume(ctx: &SessionContext, stdin: &Mutex<Option<ChildStdin>>, delay: Duration) {
    thread::sleep(delay);
    let result = match lock(stdin).as_mut() {
        Some(pipe) => pipe
            .write_all(format!("{RESUME_COMMAND}\n").as_bytes())
            .and_then(|()| pipe.flush()),
        None => Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "engine process not running",
        )),
    };
    match result {
        Ok(()) => {
            info!("Sent {RESUME_COMMAND} to engine");
            ctx.emit(&format!("Engine cmd: {RESUME_COMMAND}"));
            ctx.emit(&format!(
                "Sent {RESUME_COMMAND} to engine (no --no-pause support detected)."
            ));
        }
        Err(e) => {
            warn!(error = %e, "Failed to send {RESUME_COMMAND}");
            ctx.emit(&format!("Failed to send {RESUME_COMMAND}: {e}"));
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn create_script_file(script: &str) -> io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(SCRIPT_PREFIX)
        .suffix(SCRIPT_SUFFIX)
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = script.len(), "Wrote session script");
    Ok(path)
}

fn remove_script(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => trace!(path = %path.display(), "Removed session script"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove session script"),
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let result = unsafe { libc::kill(pid, libc::SIGTERM) };
    if result != 0 {
        debug!(pid, error = %io::Error::last_os_error(), "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) {
    let pid = pid.to_string();
    if let Err(e) = Command::new("taskkill")
        .args(["/PID", pid.as_str(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        debug!(pid = %pid, error = %e, "taskkill failed");
    }
}
