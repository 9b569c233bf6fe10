//! jtrace - trace and patch Java methods in a running Android app
//!
//! # Usage
//!
//! ```text
//! jtrace hooks add 'com.example.Api.isPro():boolean' --return-constant true
//! jtrace run -f com.example.app          # spawn, stream log, live reload
//! jtrace run --attach -p 4242 --no-watch
//! jtrace compile -o trace.js
//! jtrace ps | devices | server-status | probe
//! ```
//!
//! Stdout carries the engine log, so diagnostics go to a log file under
//! the state directory (`RUST_LOG` controls the level).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jtrace_cli::cli::{Cli, Command};
use jtrace_cli::settings::{self, Settings};
use jtrace_cli::{commands, run_session, RunOptions, Workspace};
use jtrace_engine::Supervisor;

// ============================================================================
// Logging Setup
// ============================================================================

fn create_log_file() -> Option<fs::File> {
    let log_dir = settings::state_dir();

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("jtrace.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn init_logging() {
    match create_log_file() {
        Some(file) => {
            let filter = EnvFilter::from_default_env().add_directive(
                "jtrace=info"
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO)),
            );

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
}

// ============================================================================
// Run
// ============================================================================

async fn run(
    settings: &Settings,
    workspace: &Workspace,
    session: &jtrace_cli::cli::SessionArgs,
    no_watch: bool,
) -> Result<i32> {
    let mut config = settings.session_config();
    session.apply(&mut config);
    info!(
        device_mode = %config.device_mode,
        spawn = config.spawn,
        package = %config.target_package,
        "Run requested"
    );

    let supervisor = Supervisor::new(settings.stream.clone());
    let cancel = CancellationToken::new();

    let ctrl_c_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
                info!("Ctrl-C received");
                ctrl_c_token.cancel();
            }
            _ = ctrl_c_token.cancelled() => {}
        }
    });

    let options = RunOptions {
        watch: !no_watch,
        ..RunOptions::default()
    };
    let stdout = io::stdout();
    let outcome = run_session(&supervisor, &config, workspace, options, cancel.clone(), |line| {
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{line}");
        let _ = handle.flush();
    })
    .await;

    cancel.cancel();
    let _ = ctrl_c.await;

    let outcome = outcome.context("Session failed")?;
    info!(?outcome, "Run finished");
    Ok(outcome.exit_code())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let workspace = Workspace::new(
        cli.workspace
            .clone()
            .unwrap_or_else(|| settings.workspace_path()),
    );
    let mut stdout = io::stdout();

    let code = match &cli.command {
        Command::Run { session, no_watch } => run(&settings, &workspace, session, *no_watch).await?,
        Command::Compile { output } => commands::compile(&workspace, output.as_deref(), &mut stdout)?,
        Command::Ps { session } => {
            let mut config = settings.session_config();
            session.apply(&mut config);
            tokio::task::spawn_blocking(move || {
                let mut stdout = io::stdout();
                commands::list_processes(&config, &mut stdout)
            })
            .await??
        }
        Command::Devices => commands::list_devices(&settings.session_config(), &mut stdout)?,
        Command::ServerStatus { device } => {
            commands::server_status(&settings.session_config(), device.as_deref(), &mut stdout)?
        }
        Command::Probe { engine } => {
            let config = settings.session_config();
            let engine = engine.as_deref().unwrap_or(config.engine_executable());
            commands::probe(engine, &mut stdout)?
        }
        Command::Hooks(command) => commands::hooks(&workspace, command, &mut stdout)?,
        Command::Scripts(command) => commands::scripts(&workspace, command, &mut stdout)?,
    };

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
