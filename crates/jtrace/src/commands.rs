//! Subcommands other than `run`.
//!
//! Each writes its report to `out` and returns the process exit status.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use jtrace_core::{HookSpec, ScriptOptions, SessionConfig};
use jtrace_engine::{adb, CapabilityProber};
use jtrace_protocol::CustomScriptEntry;
use tracing::{debug, info};

use crate::cli::{AddHookArgs, HooksCommand, ScriptsCommand};
use crate::error::{CliError, Result};
use crate::hooks;
use crate::runner::compile_program;
use crate::workspace::Workspace;

// ============================================================================
// Program
// ============================================================================

/// Compiles the workspace program to `output` or `out`.
pub fn compile(workspace: &Workspace, output: Option<&Path>, out: &mut dyn Write) -> Result<i32> {
    let state = workspace.load()?;
    let mut warnings = Vec::new();
    let program = compile_program(&state, &mut HashSet::new(), |m| warnings.push(m.to_string()));
    for warning in &warnings {
        writeln!(out, "// {warning}")?;
    }
    match output {
        Some(path) => {
            fs::write(path, &program)?;
            info!(path = %path.display(), bytes = program.len(), "Wrote program");
            writeln!(out, "Wrote {} bytes to {}", program.len(), path.display())?;
        }
        None => out.write_all(program.as_bytes())?,
    }
    Ok(0)
}

// ============================================================================
// Discovery
// ============================================================================

pub fn list_processes(config: &SessionConfig, out: &mut dyn Write) -> Result<i32> {
    let processes = jtrace_engine::list_processes(config);
    if processes.is_empty() {
        writeln!(out, "No processes found (is {} on PATH and the device reachable?)", config.process_list_executable())?;
        return Ok(1);
    }
    writeln!(out, "{:>7}  NAME", "PID")?;
    for process in &processes {
        writeln!(out, "{:>7}  {}", process.pid, process.name)?;
    }
    Ok(0)
}

pub fn list_devices(config: &SessionConfig, out: &mut dyn Write) -> Result<i32> {
    let devices = adb::list_devices(config.adb_executable());
    if devices.is_empty() {
        writeln!(out, "No devices found.")?;
        return Ok(1);
    }
    for device in &devices {
        writeln!(out, "{:<24} {:<14} {}", device.id, device.status, device.description)?;
    }
    Ok(0)
}

pub fn server_status(config: &SessionConfig, device: Option<&str>, out: &mut dyn Write) -> Result<i32> {
    let device = device.unwrap_or(&config.device_id).trim();
    let status = adb::check_server(config.adb_executable(), device);
    writeln!(out, "present: {}", if status.present { "yes" } else { "no" })?;
    writeln!(out, "running: {}", if status.running { "yes" } else { "no" })?;
    if !status.details.trim().is_empty() {
        writeln!(out, "{}", status.details.trim_end())?;
    }
    Ok(if status.running { 0 } else { 1 })
}

pub fn probe(engine: &str, out: &mut dyn Write) -> Result<i32> {
    let caps = CapabilityProber::new().probe(engine);
    let version = if caps.version.is_empty() { "unknown" } else { caps.version.as_str() };
    writeln!(out, "engine:       {engine}")?;
    writeln!(out, "version:      {version}")?;
    writeln!(out, "no-pause:     {}", yes_no(caps.supports_no_pause))?;
    writeln!(out, "auto-reload:  {}", yes_no(caps.supports_auto_reload))?;
    Ok(0)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

// ============================================================================
// Workspace Edits
// ============================================================================

pub fn hooks(workspace: &Workspace, command: &HooksCommand, out: &mut dyn Write) -> Result<i32> {
    let mut state = workspace.load()?;
    match command {
        HooksCommand::List => {
            if state.registry.is_empty() {
                writeln!(out, "No hooks in {}", workspace.path().display())?;
            }
            for line in hooks::describe_hooks(&state) {
                writeln!(out, "{line}")?;
            }
            return Ok(0);
        }
        HooksCommand::Templates => {
            for name in hooks::template_names() {
                writeln!(out, "{name}")?;
            }
            return Ok(0);
        }
        HooksCommand::Add(args) => {
            let spec = build_spec(args)?;
            let key = spec.hook_id().to_string();
            let added = hooks::add_hook(&mut state, spec)?;
            writeln!(out, "{} {key}", if added { "Added" } else { "Updated" })?;
        }
        HooksCommand::Remove { key } => {
            hooks::remove_hook(&mut state, key)?;
            writeln!(out, "Removed {key}")?;
        }
        HooksCommand::Enable { keys } => {
            let changed = hooks::set_hooks_active(&mut state, keys, true)?;
            writeln!(out, "Enabled {changed} hook(s)")?;
        }
        HooksCommand::Disable { keys } => {
            let changed = hooks::set_hooks_active(&mut state, keys, false)?;
            writeln!(out, "Disabled {changed} hook(s)")?;
        }
        HooksCommand::Clear => {
            let count = state.registry.len();
            state.registry.clear();
            writeln!(out, "Removed {count} hook(s)")?;
        }
    }
    workspace.save(&state)?;
    Ok(0)
}

fn build_spec(args: &AddHookArgs) -> Result<HookSpec> {
    let target = hooks::parse_signature(&args.signature, args.is_static)?;
    let options = ScriptOptions {
        log_args: !args.no_args,
        log_return: !args.no_return,
        log_thread: !args.no_thread,
        print_stack: args.stack,
        print_this: args.this,
        pretty_print: !args.raw,
    };
    let snippet = match (&args.snippet, &args.snippet_file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    let spec = HookSpec::new(target, options)
        .with_patch(args.patch_rule())
        .with_snippet(snippet, args.position());
    debug!(key = spec.hook_id(), "Built hook from arguments");
    match &args.template {
        Some(name) => hooks::apply_template(spec, name),
        None => Ok(spec),
    }
}

pub fn scripts(workspace: &Workspace, command: &ScriptsCommand, out: &mut dyn Write) -> Result<i32> {
    let mut state = workspace.load()?;
    match command {
        ScriptsCommand::List => {
            if state.custom_scripts.is_empty() {
                writeln!(out, "No custom scripts")?;
            }
            for entry in &state.custom_scripts {
                writeln!(out, "[{}] {}", if entry.enabled { "x" } else { " " }, entry.path)?;
            }
            return Ok(0);
        }
        ScriptsCommand::Add { path } => {
            let path = fs::canonicalize(path)?.to_string_lossy().into_owned();
            match state.custom_scripts.iter_mut().find(|e| e.path == path) {
                Some(entry) => entry.enabled = true,
                None => state.custom_scripts.push(CustomScriptEntry::new(path.clone(), true)),
            }
            writeln!(out, "Added {path}")?;
        }
        ScriptsCommand::Remove { path } => {
            let before = state.custom_scripts.len();
            state.custom_scripts.retain(|e| e.path != *path);
            if state.custom_scripts.len() == before {
                return Err(script_not_found(path));
            }
            writeln!(out, "Removed {path}")?;
        }
        ScriptsCommand::Enable { path } | ScriptsCommand::Disable { path } => {
            let enabled = matches!(command, ScriptsCommand::Enable { .. });
            let entry = state
                .custom_scripts
                .iter_mut()
                .find(|e| e.path == *path)
                .ok_or_else(|| script_not_found(path))?;
            entry.enabled = enabled;
            writeln!(out, "{} {path}", if enabled { "Enabled" } else { "Disabled" })?;
        }
    }
    workspace.save(&state)?;
    Ok(0)
}

fn script_not_found(path: &str) -> CliError {
    jtrace_core::DomainError::InvalidFieldValue {
        field: "custom script".to_string(),
        value: path.to_string(),
        expected: "a path from `jtrace scripts list`".to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn run_hooks(workspace: &Workspace, args: &[&str]) -> (Result<i32>, String) {
        let cli = Cli::try_parse_from(["jtrace", "hooks"].iter().chain(args)).unwrap();
        let Command::Hooks(command) = cli.command else {
            panic!("expected hooks");
        };
        let mut out = Vec::new();
        let result = hooks(workspace, &command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_hooks_add_list_disable_compile() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path().join("hooks.json"));

        let (result, text) = run_hooks(
            &workspace,
            &["add", "com.example.Api.isPro():boolean", "--return-constant", "true", "--stack"],
        );
        assert_eq!(result.unwrap(), 0);
        assert_eq!(text, "Added com.example.Api.isPro():boolean\n");

        run_hooks(&workspace, &["add", "com.example.Api.<init>(int)"]).0.unwrap();

        let (_, text) = run_hooks(&workspace, &["list"]);
        assert_eq!(
            text,
            "  1  com.example.Api.isPro():boolean [active]  (patch=CONSTANT, stack)\n  2  com.example.Api.$init(int):void [active]\n"
        );

        let (result, text) = run_hooks(&workspace, &["disable", "com.example.Api.$init(int):void"]);
        assert_eq!(result.unwrap(), 0);
        assert_eq!(text, "Disabled 1 hook(s)\n");

        let mut out = Vec::new();
        compile(&workspace, None, &mut out).unwrap();
        let program = String::from_utf8(out).unwrap();
        assert!(program.contains("com.example.Api.isPro():boolean"));
        assert!(!program.contains("com.example.Api.$init(int):void"));
    }

    #[test]
    fn test_hooks_add_invalid_patch_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path().join("hooks.json"));
        let (result, _) = run_hooks(&workspace, &["add", "a.B.c()", "--return-constant", "1"]);
        assert!(result.is_err());
        assert!(workspace.fingerprint().is_none());
    }

    #[test]
    fn test_hooks_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path().join("hooks.json"));
        let (result, _) = run_hooks(&workspace, &["remove", "a.B.c():void"]);
        assert!(matches!(result, Err(CliError::Domain(_))));
    }

    #[test]
    fn test_scripts_add_disable_remove() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path().join("hooks.json"));
        let script = dir.path().join("global.js");
        fs::write(&script, "var x = 1;").unwrap();
        let canonical = fs::canonicalize(&script).unwrap().to_string_lossy().into_owned();

        let mut out = Vec::new();
        scripts(&workspace, &ScriptsCommand::Add { path: script.clone() }, &mut out).unwrap();
        scripts(&workspace, &ScriptsCommand::Disable { path: canonical.clone() }, &mut out).unwrap();

        let mut listing = Vec::new();
        scripts(&workspace, &ScriptsCommand::List, &mut listing).unwrap();
        assert_eq!(String::from_utf8(listing).unwrap(), format!("[ ] {canonical}\n"));

        scripts(&workspace, &ScriptsCommand::Enable { path: canonical.clone() }, &mut out).unwrap();
        let mut program = Vec::new();
        compile(&workspace, None, &mut program).unwrap();
        assert!(String::from_utf8(program).unwrap().contains(&format!("// -- {canonical}\nvar x = 1;")));

        scripts(&workspace, &ScriptsCommand::Remove { path: canonical.clone() }, &mut out).unwrap();
        assert!(scripts(&workspace, &ScriptsCommand::Remove { path: canonical }, &mut out).is_err());
    }

    #[test]
    fn test_compile_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path().join("hooks.json"));
        let target = dir.path().join("out.js");
        let mut out = Vec::new();
        compile(&workspace, Some(&target), &mut out).unwrap();
        assert!(fs::read_to_string(&target).unwrap().contains("// no hooks"));
        assert!(String::from_utf8(out).unwrap().starts_with("Wrote "));
    }
}
