//! Subcommand implementations.

use std::sync::Arc;

use pshandle_core::PshandleError;
use pshandle_proc::{
    ancestors, running, ProcessHandle, ProcessReport, ProcessSummary, Procfs, ProcfsConfig,
    ReportOptions,
};
use serde::Serialize;
use tracing::debug;

use crate::{AncestorsArgs, InspectArgs, ProcSource, RunningArgs};

/// Build the proc context from `--config` and `--proc-root`.
///
/// `--proc-root` wins over a root named in the config file.
pub(crate) fn open_procfs(source: &ProcSource) -> Result<Arc<Procfs>, PshandleError> {
    let mut config = match &source.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                PshandleError::system_io(format!("read config {}", path.display()), &e)
            })?;
            ProcfsConfig::from_json_str(&text)?
        }
        None => ProcfsConfig::default(),
    };
    if let Some(root) = &source.proc_root {
        config.root = root.clone();
    }
    debug!(root = %config.root.display(), "using proc filesystem");
    Ok(Arc::new(Procfs::with_config(config)?))
}

pub(crate) fn run_inspect(procfs: &Arc<Procfs>, args: InspectArgs) -> Result<i32, PshandleError> {
    let handle = ProcessHandle::open(procfs, args.pid, args.create_time)?;
    let report = handle.report(&ReportOptions {
        include_environ: args.environ,
    })?;

    if args.table {
        print_report_table(&report);
        for w in &report.warnings {
            eprintln!("Warning: {w}");
        }
        return Ok(0);
    }

    // Default to JSON
    print_json(&report)?;
    Ok(0)
}

pub(crate) fn run_running(procfs: &Arc<Procfs>, args: RunningArgs) -> Result<i32, PshandleError> {
    let handle = ProcessHandle::open(procfs, args.pid, Some(args.create_time))?;
    let result = running(&handle);

    if args.json {
        print_json(&result)?;
    } else if result.running {
        println!("PID {} is running", result.pid);
    } else {
        println!("PID {} is not running", result.pid);
    }
    Ok(if result.running { 0 } else { 1 })
}

pub(crate) fn run_ancestors(
    procfs: &Arc<Procfs>,
    args: AncestorsArgs,
) -> Result<i32, PshandleError> {
    let handle = ProcessHandle::open(procfs, args.pid, None)?;
    let result = ancestors(&handle)?;

    if args.json {
        print_json(&result)?;
        return Ok(0);
    }

    println!("{}", result.process);
    for (depth, summary) in result.ancestors.iter().enumerate() {
        println!("{}└─ {}", "   ".repeat(depth), summary_line(summary));
    }
    for w in &result.warnings {
        eprintln!("Warning: {w}");
    }
    Ok(0)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), PshandleError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PshandleError::system(format!("serialize output: {e}"), 0))?;
    println!("{text}");
    Ok(())
}

fn summary_line(summary: &ProcessSummary) -> String {
    format!("{} [{}]", summary, summary.status)
}

/// Print a report as a two-column table.
fn print_report_table(report: &ProcessReport) {
    let mut rows: Vec<(&str, String)> = vec![
        ("PID", report.pid.to_string()),
        ("PPID", report.ppid.to_string()),
        ("NAME", report.name.clone()),
        ("STATUS", report.status.to_string()),
        ("CREATED", report.create_time.to_string()),
    ];

    let dash = || "-".to_string();
    rows.push((
        "TERMINAL",
        report.terminal.map(|t| t.to_string()).unwrap_or_else(dash),
    ));
    rows.push(("USER", report.username.clone().unwrap_or_else(dash)));
    rows.push((
        "UID",
        report
            .uids
            .map(|u| format!("{} {} {}", u.real, u.effective, u.saved))
            .unwrap_or_else(dash),
    ));
    rows.push((
        "GID",
        report
            .gids
            .map(|g| format!("{} {} {}", g.real, g.effective, g.saved))
            .unwrap_or_else(dash),
    ));
    rows.push((
        "THREADS",
        report.num_threads.map(|n| n.to_string()).unwrap_or_else(dash),
    ));
    rows.push((
        "CPU(s)",
        report
            .cpu_times
            .map(|c| format!("user {:.2} system {:.2}", c.user, c.system))
            .unwrap_or_else(dash),
    ));
    rows.push((
        "RSS(KB)",
        report
            .memory_bytes
            .map(|m| (m.rss / 1024).to_string())
            .unwrap_or_else(dash),
    ));
    rows.push(("EXE", report.exe.clone().unwrap_or_else(dash)));
    rows.push(("CWD", report.cwd.clone().unwrap_or_else(dash)));
    rows.push((
        "CMDLINE",
        report
            .cmdline
            .as_ref()
            .map(|args| truncate(&args.join(" "), 120).to_string())
            .unwrap_or_else(dash),
    ));
    if let Some(environ) = &report.environ {
        rows.push(("ENVIRON", format!("{} entries", environ.len())));
    }

    println!("{:<10} VALUE", "FIELD");
    println!("{:-<80}", "");
    for (field, value) in rows {
        println!("{:<10} {}", field, value);
    }
}

/// Truncate string to max characters (not bytes).
///
/// Safe for UTF-8 strings with multi-byte characters.
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s, // String has fewer than max_chars characters
    }
}
