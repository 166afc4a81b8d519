use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pshandle_core::{get_platform, PshandleError};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[cfg(target_os = "linux")]
mod commands;

/// PID-reuse-safe process inspection.
#[derive(Parser, Debug)]
#[command(name = "pshandle", version, about, long_about = None)]
struct Cli {
    /// The format for log output.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// The minimum log level to display.
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: tracing::Level,

    /// Mount point of the proc filesystem.
    #[arg(long, value_name = "DIR", env = "PSHANDLE_PROC_ROOT", global = true)]
    proc_root: Option<PathBuf>,

    /// JSON file with proc filesystem settings (read hints, readlink bounds).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report everything known about a process.
    ///
    /// Output is JSON by default for automation, or table format for human
    /// consumption. Exits 1 if the process is gone.
    Inspect(InspectArgs),

    /// Check whether a PID still names the process created at a given time.
    ///
    /// Exits 0 when it does, 1 when the process exited or the PID was reused.
    Running(RunningArgs),

    /// List the ancestors of a process, parent first.
    Ancestors(AncestorsArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Process ID.
    #[arg(long, value_name = "PID")]
    pid: u32,

    /// Expected creation time (epoch seconds) from an earlier inspection.
    ///
    /// When given, the report fails unless the PID still names that process.
    #[arg(long, value_name = "SECS")]
    create_time: Option<f64>,

    /// Include the environment in the report.
    #[arg(long)]
    environ: bool,

    /// Output as JSON (default for automation).
    #[arg(long)]
    json: bool,

    /// Output as human-readable table.
    #[arg(long, conflicts_with = "json")]
    table: bool,
}

#[derive(Parser, Debug)]
struct RunningArgs {
    /// Process ID.
    #[arg(long, value_name = "PID")]
    pid: u32,

    /// Creation time (epoch seconds) the process had when first seen.
    #[arg(long, value_name = "SECS")]
    create_time: f64,

    /// Output JSON result.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct AncestorsArgs {
    /// Process ID to start from.
    #[arg(long, value_name = "PID")]
    pid: u32,

    /// Output JSON result.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable text format.
    Text,
    /// Machine-readable JSON format.
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize the tracing subscriber
    let filter = EnvFilter::from_default_env().add_directive(cli.log_level.into());

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    info!("Initialization complete. Starting main logic.");
    if let Some(command) = cli.command {
        let source = ProcSource {
            proc_root: cli.proc_root,
            config: cli.config,
        };
        match run_command(&source, command) {
            Ok(exit_code) => {
                info!("Main logic finished.");
                std::process::exit(exit_code);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Platform: {}", get_platform());
    }
    info!("Main logic finished.");
}

/// Where the proc filesystem settings come from.
#[derive(Debug, Default)]
struct ProcSource {
    proc_root: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[cfg(target_os = "linux")]
fn run_command(source: &ProcSource, command: Command) -> Result<i32, PshandleError> {
    let procfs = commands::open_procfs(source)?;
    match command {
        Command::Inspect(args) => commands::run_inspect(&procfs, args),
        Command::Running(args) => commands::run_running(&procfs, args),
        Command::Ancestors(args) => commands::run_ancestors(&procfs, args),
    }
}

#[cfg(not(target_os = "linux"))]
fn run_command(_source: &ProcSource, _command: Command) -> Result<i32, PshandleError> {
    Err(PshandleError::not_supported(
        "process handles",
        get_platform(),
    ))
}
