//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use jtrace_core::{DeviceMode, ReturnPatchRule, SessionConfig, SnippetPosition};

// ============================================================================
// Top Level
// ============================================================================

/// jtrace - trace and patch Java methods in a running Android app
#[derive(Parser, Debug)]
#[command(name = "jtrace")]
#[command(about = "Trace and patch Java methods through a dynamic instrumentation engine")]
#[command(version)]
pub struct Cli {
    /// Settings file (default: <config dir>/jtrace/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hook workspace file (default: <state dir>/jtrace/hooks.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a session with the workspace hooks and stream its log
    Run {
        #[command(flatten)]
        session: SessionArgs,
        /// Do not reload when the workspace file changes
        #[arg(long)]
        no_watch: bool,
    },
    /// Print the compiled program for the workspace
    Compile {
        /// Write to a file instead of stdout
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// List processes on the device
    Ps {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// List devices known to the debug bridge
    Devices,
    /// Check the engine server on the device
    ServerStatus {
        /// Device serial (default: the configured device)
        #[arg(long, short = 'd')]
        device: Option<String>,
    },
    /// Show engine version and optional flag support
    Probe {
        /// Engine executable (default: the configured engine)
        #[arg(long)]
        engine: Option<String>,
    },
    /// Edit the hooks in the workspace
    #[command(subcommand)]
    Hooks(HooksCommand),
    /// Edit the custom script list in the workspace
    #[command(subcommand)]
    Scripts(ScriptsCommand),
}

// ============================================================================
// Session Overrides
// ============================================================================

/// Flags overriding the `[session]` settings.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
    /// USB device serial
    #[arg(long, short = 'd', conflicts_with = "remote")]
    pub device: Option<String>,
    /// Engine server address, HOST or HOST:PORT
    #[arg(long, short = 'H', value_name = "HOST[:PORT]")]
    pub remote: Option<String>,
    /// Attach to a running process instead of spawning
    #[arg(long)]
    pub attach: bool,
    /// Spawn the target package
    #[arg(long, conflicts_with = "attach")]
    pub spawn: bool,
    /// Target package name
    #[arg(long, short = 'f')]
    pub package: Option<String>,
    /// Target process name (attach)
    #[arg(long, short = 'n')]
    pub process: Option<String>,
    /// Target PID (attach)
    #[arg(long, short = 'p')]
    pub pid: Option<u32>,
    /// Engine executable
    #[arg(long)]
    pub engine: Option<String>,
    /// Extra engine arguments, shell-quoted
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub extra_args: Option<String>,
}

impl SessionArgs {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut SessionConfig) {
        if let Some(device) = &self.device {
            config.device_mode = DeviceMode::Usb;
            config.device_id = device.trim().to_string();
        }
        if let Some(remote) = &self.remote {
            config.device_mode = DeviceMode::Remote;
            let remote = remote.trim();
            match remote.rsplit_once(':').and_then(|(h, p)| Some((h, p.parse::<u16>().ok()?))) {
                Some((host, port)) => {
                    config.remote_host = host.to_string();
                    config.remote_port = port;
                }
                None => config.remote_host = remote.to_string(),
            }
        }
        if self.attach {
            config.spawn = false;
        }
        if self.spawn {
            config.spawn = true;
        }
        if let Some(package) = &self.package {
            config.target_package = package.trim().to_string();
        }
        if let Some(process) = &self.process {
            config.target_process = process.trim().to_string();
        }
        if self.pid.is_some() {
            config.target_pid = self.pid;
        }
        if self.pid.is_some() || self.process.is_some() {
            config.spawn = config.spawn && self.spawn;
        }
        if let Some(engine) = &self.engine {
            config.engine_path = engine.trim().to_string();
        }
        if let Some(extra) = &self.extra_args {
            config.extra_engine_args = extra.clone();
        }
    }
}

// ============================================================================
// Hooks
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum HooksCommand {
    /// List hooks in workspace order
    List,
    /// Add a hook, or replace the hook with the same signature
    Add(AddHookArgs),
    /// Remove a hook by signature
    Remove {
        key: String,
    },
    /// Enable hooks by signature
    Enable {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Disable hooks by signature
    Disable {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Remove every hook
    Clear,
    /// List the built-in snippet templates
    Templates,
}

#[derive(Args, Debug, Default, Clone)]
pub struct AddHookArgs {
    /// Signature, e.g. `com.example.Api.check(java.lang.String):boolean`
    pub signature: String,
    /// The method is static
    #[arg(long = "static")]
    pub is_static: bool,

    /// Do not log arguments
    #[arg(long)]
    pub no_args: bool,
    /// Do not log the return value
    #[arg(long)]
    pub no_return: bool,
    /// Do not log the thread name
    #[arg(long)]
    pub no_thread: bool,
    /// Log a stack trace per call
    #[arg(long)]
    pub stack: bool,
    /// Log the receiver object
    #[arg(long)]
    pub this: bool,
    /// Identity strings instead of pretty-printed objects
    #[arg(long)]
    pub raw: bool,

    /// Replace the return value with a constant (`js:`/`raw:` for code)
    #[arg(long, value_name = "VALUE", group = "patch", allow_hyphen_values = true)]
    pub return_constant: Option<String>,
    /// Replace the return value with an expression over `ret`, `args`, `self`
    #[arg(long, value_name = "EXPR", group = "patch")]
    pub return_expr: Option<String>,
    /// Replace the return value when a condition holds
    #[arg(long, value_name = "COND", group = "patch", requires = "then")]
    pub return_if: Option<String>,
    /// Value when `--return-if` holds
    #[arg(long, value_name = "VALUE", requires = "return_if", allow_hyphen_values = true)]
    pub then: Option<String>,
    /// Value when `--return-if` does not hold (default: original)
    #[arg(long = "else", value_name = "VALUE", requires = "return_if", allow_hyphen_values = true)]
    pub otherwise: Option<String>,
    /// Replace the return value with a function body's result
    #[arg(long, value_name = "BODY", group = "patch")]
    pub return_script: Option<String>,

    /// Snippet run inside the hook
    #[arg(long, value_name = "CODE", conflicts_with_all = ["snippet_file", "template"])]
    pub snippet: Option<String>,
    /// Snippet read from a file
    #[arg(long, value_name = "PATH", conflicts_with = "template")]
    pub snippet_file: Option<PathBuf>,
    /// Built-in template used as the snippet
    #[arg(long, value_name = "NAME")]
    pub template: Option<String>,
    /// Run the snippet before the original call
    #[arg(long)]
    pub prepend: bool,
}

impl AddHookArgs {
    /// The return patch requested on the command line, disabled if none.
    pub fn patch_rule(&self) -> ReturnPatchRule {
        if let Some(value) = &self.return_constant {
            return ReturnPatchRule::constant(value.clone());
        }
        if let Some(expression) = &self.return_expr {
            return ReturnPatchRule::expression(expression.clone());
        }
        if let Some(condition) = &self.return_if {
            return ReturnPatchRule::conditional(
                condition.clone(),
                self.then.clone().unwrap_or_default(),
                self.otherwise.clone().unwrap_or_default(),
            );
        }
        if let Some(body) = &self.return_script {
            return ReturnPatchRule::script(body.clone());
        }
        ReturnPatchRule::default()
    }

    pub fn position(&self) -> SnippetPosition {
        if self.prepend {
            SnippetPosition::Prepend
        } else {
            SnippetPosition::Append
        }
    }
}

// ============================================================================
// Custom Scripts
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ScriptsCommand {
    /// List custom scripts
    List,
    /// Add a custom script (enabled)
    Add { path: PathBuf },
    /// Remove a custom script
    Remove { path: String },
    /// Enable a custom script
    Enable { path: String },
    /// Disable a custom script
    Disable { path: String },
}
