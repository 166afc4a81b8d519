//! pshandle-proc: PID-reuse-safe process handles for Linux
//!
//! A [`ProcessHandle`] remembers the creation time of the process it was
//! opened for. Every accessor re-reads the kernel's accounting files under
//! `/proc`, recomputes the creation time and fails with `NoSuchProcess`
//! rather than return data belonging to a process that recycled the PID.
//!
//! ## Features
//!
//! - **Identity checks**: creation time from `/proc/[pid]/stat` start ticks
//!   and the boot time in `/proc/stat`
//! - **Failure triage**: missing files are told apart from missing processes
//! - **Accessors**: name, command line, environment, ids, terminal, threads,
//!   CPU times, memory, executable, working directory, parent
//! - **Stable JSON output**: schema-versioned reports for automation
//!
//! ## Sources
//!
//! | Accessor | File |
//! |----------|------|
//! | identity, name, state, ppid, terminal, threads, CPU times | `/proc/[pid]/stat` |
//! | command line / environment | `/proc/[pid]/cmdline`, `/proc/[pid]/environ` |
//! | user / group ids | `/proc/[pid]/status` |
//! | memory | `/proc/[pid]/statm` |
//! | executable / working directory | `/proc/[pid]/exe`, `/proc/[pid]/cwd` |
//!
//! ## Example
//!
//! ```rust,no_run
//! use pshandle_proc::{ProcessHandle, Procfs};
//! use std::sync::Arc;
//!
//! let procfs = Arc::new(Procfs::new());
//! let me = ProcessHandle::current(&procfs).unwrap();
//! println!("{}", me);
//!
//! // Later, possibly after the PID was recycled:
//! let same = ProcessHandle::open(&procfs, me.pid(), Some(me.create_time())).unwrap();
//! match same.cmdline() {
//!     Ok(args) => println!("{:?}", args),
//!     Err(e) if e.is_gone() => println!("process exited"),
//!     Err(e) => println!("error: {}", e),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[cfg(target_os = "linux")]
mod ancestry;
#[cfg(target_os = "linux")]
mod calibration;
#[cfg(target_os = "linux")]
mod config;
#[cfg(target_os = "linux")]
mod handle;
#[cfg(target_os = "linux")]
mod procfs;
#[cfg(target_os = "linux")]
mod readlink;
#[cfg(target_os = "linux")]
mod records;
#[cfg(target_os = "linux")]
mod report;
#[cfg(target_os = "linux")]
mod stat;
#[cfg(target_os = "linux")]
mod triage;
#[cfg(target_os = "linux")]
mod users;

#[cfg(target_os = "linux")]
pub use ancestry::{ancestors, running, AncestorsResult, RunningResult};
#[cfg(target_os = "linux")]
pub use calibration::{page_size, Calibration};
#[cfg(target_os = "linux")]
pub use config::ProcfsConfig;
#[cfg(target_os = "linux")]
pub use handle::{ProcessHandle, MAX_SAFE_PID, UNKNOWN_NAME};
#[cfg(target_os = "linux")]
pub use procfs::Procfs;
#[cfg(target_os = "linux")]
pub use readlink::{strip_deleted_suffix, DELETED_SUFFIX};
#[cfg(target_os = "linux")]
pub use report::{ProcessReport, ReportOptions};
#[cfg(target_os = "linux")]
pub use stat::{parse_stat, StatParseError, StatRecord};
#[cfg(target_os = "linux")]
pub use triage::classify_read_failure;
#[cfg(target_os = "linux")]
pub use users::lookup_username;

// ============================================================================
// Core Types
// ============================================================================

/// Run-state category.
///
/// Maps the single-character state code of `/proc/[pid]/stat` to a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// `R`: running or runnable.
    Running,
    /// `S` (interruptible sleep) and `I` (idle kernel thread).
    Sleeping,
    /// `D`: uninterruptible sleep, usually disk I/O.
    DiskSleep,
    /// `T`: stopped by a signal.
    Stopped,
    /// `t`: stopped by a tracer.
    TracingStop,
    /// `Z`: terminated but not yet reaped.
    Zombie,
    /// `X`: dead.
    Dead,
    /// `K`: wakekill (kernels 2.6.33 to 3.13).
    WakeKill,
    /// `W`: waking (kernels 2.6.33 to 3.13).
    Waking,
}

impl ProcessStatus {
    /// Resolve a state code; `None` for codes outside the known set.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'R' => Some(ProcessStatus::Running),
            'S' | 'I' => Some(ProcessStatus::Sleeping),
            'D' => Some(ProcessStatus::DiskSleep),
            'T' => Some(ProcessStatus::Stopped),
            't' => Some(ProcessStatus::TracingStop),
            'Z' => Some(ProcessStatus::Zombie),
            'X' | 'x' => Some(ProcessStatus::Dead),
            'K' => Some(ProcessStatus::WakeKill),
            'W' => Some(ProcessStatus::Waking),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Sleeping => "sleeping",
            ProcessStatus::DiskSleep => "disk_sleep",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::TracingStop => "tracing_stop",
            ProcessStatus::Zombie => "zombie",
            ProcessStatus::Dead => "dead",
            ProcessStatus::WakeKill => "wake_kill",
            ProcessStatus::Waking => "waking",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuTimes {
    /// Time scheduled in user mode.
    pub user: f64,
    /// Time scheduled in kernel mode.
    pub system: f64,
    /// User time of waited-for children.
    pub children_user: f64,
    /// Kernel time of waited-for children.
    pub children_system: f64,
}

/// Memory counters from `/proc/[pid]/statm`, in pages.
///
/// Use [`MemoryInfo::to_bytes`] with [`page_size`] to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemoryInfo {
    /// Resident set size.
    pub rss: u64,
    /// Virtual memory size.
    pub vms: u64,
    /// Resident shared pages (file or shmem backed).
    pub shared: u64,
    /// Text (code).
    pub text: u64,
    /// Library; always 0 since Linux 2.6.
    pub lib: u64,
    /// Data plus stack.
    pub data: u64,
    /// Dirty pages; always 0 since Linux 2.6.
    pub dirty: u64,
}

impl MemoryInfo {
    /// Same counters multiplied by `page_size`.
    pub fn to_bytes(&self, page_size: u64) -> MemoryInfo {
        MemoryInfo {
            rss: self.rss.saturating_mul(page_size),
            vms: self.vms.saturating_mul(page_size),
            shared: self.shared.saturating_mul(page_size),
            text: self.text.saturating_mul(page_size),
            lib: self.lib.saturating_mul(page_size),
            data: self.data.saturating_mul(page_size),
            dirty: self.dirty.saturating_mul(page_size),
        }
    }
}

/// Real, effective and saved user or group ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdTriple {
    pub real: u32,
    pub effective: u32,
    pub saved: u32,
}

/// Printable description of a handle, see `ProcessHandle::format`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSummary {
    /// Command name, or `"???"` when unreadable.
    pub name: String,

    pub pid: u32,

    /// Creation time in epoch seconds.
    pub create_time: f64,

    /// Run-state category, `"unknown"` or `"terminated"`.
    pub status: String,
}

impl fmt::Display for ProcessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID={}, NAME={}, AT={}",
            self.pid,
            self.name,
            epoch_to_rfc3339(self.create_time)
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Render epoch seconds as RFC 3339, falling back to the raw number.
pub(crate) fn epoch_to_rfc3339(secs: f64) -> String {
    let nanos = (secs * 1e9).round() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{}", secs))
}

/// Get current timestamp in ISO 8601 format.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn current_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// ============================================================================
// Tests
// ============================================================================
