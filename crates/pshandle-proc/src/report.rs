//! Best-effort report of everything a handle can tell.

use crate::calibration::page_size;
use crate::handle::ProcessHandle;
use crate::users::lookup_username;
use crate::{current_timestamp, CpuTimes, IdTriple, MemoryInfo, ProcessStatus};
use pshandle_core::schema::PROCESS_REPORT_V1;
use pshandle_core::{get_platform, PshandleResult};
use serde::Serialize;

/// What [`ProcessHandle::report`] collects beyond the defaults.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Include the environment. Off by default; it often carries secrets.
    pub include_environ: bool,
}

/// Snapshot of one process.
///
/// Identity fields are always present. Every other field is `None` when its
/// accessor failed, and the failure is recorded in `warnings`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    /// Schema identifier for version detection.
    pub schema_id: &'static str,

    /// Timestamp of report creation (ISO 8601).
    pub timestamp: String,

    /// Current platform.
    pub platform: &'static str,

    pub pid: u32,

    /// Creation time in epoch seconds.
    pub create_time: f64,

    pub ppid: u32,

    pub name: String,

    pub status: ProcessStatus,

    /// Controlling terminal device number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environ: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uids: Option<IdTriple>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gids: Option<IdTriple>,

    /// Account name of the real user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_times: Option<CpuTimes>,

    /// Memory counters converted to bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<MemoryInfo>,

    /// Accessors that failed, with the reason.
    pub warnings: Vec<String>,
}

/// Keep a value, or record why it is missing.
///
/// A gone process aborts the whole report: the remaining fields would
/// describe nothing.
fn best_effort<T>(
    field: &str,
    result: PshandleResult<T>,
    warnings: &mut Vec<String>,
) -> PshandleResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_gone() => Err(err),
        Err(err) => {
            warnings.push(format!("{}: {}", field, err));
            Ok(None)
        }
    }
}

impl ProcessHandle {
    /// Collect every accessor into a [`ProcessReport`].
    ///
    /// # Errors
    ///
    /// Fails only for errors of the identity fields (name, parent, status)
    /// and when any accessor reports the process gone.
    pub fn report(&self, options: &ReportOptions) -> PshandleResult<ProcessReport> {
        let name = self.name()?;
        let ppid = self.ppid()?;
        let status = self.status()?;

        let mut warnings = Vec::new();
        let w = &mut warnings;

        let terminal = best_effort("terminal", self.terminal(), w)?.flatten();
        let exe = best_effort("exe", self.exe(), w)?
            .flatten()
            .map(|p| p.to_string_lossy().into_owned());
        let cwd = best_effort("cwd", self.cwd(), w)?.map(|p| p.to_string_lossy().into_owned());
        let cmdline = best_effort("cmdline", self.cmdline(), w)?;
        let environ = if options.include_environ {
            best_effort("environ", self.environ(), w)?
        } else {
            None
        };
        let uids = best_effort("uids", self.uids(), w)?;
        let gids = best_effort("gids", self.gids(), w)?;
        let username = match uids {
            Some(ids) => best_effort("username", lookup_username(ids.real), w)?.flatten(),
            None => None,
        };
        let num_threads = best_effort("num_threads", self.num_threads(), w)?;
        let cpu_times = best_effort("cpu_times", self.cpu_times(), w)?;
        let memory_bytes =
            best_effort("memory_info", self.memory_info(), w)?.map(|m| m.to_bytes(page_size()));

        Ok(ProcessReport {
            schema_id: PROCESS_REPORT_V1,
            timestamp: current_timestamp(),
            platform: get_platform(),
            pid: self.pid(),
            create_time: self.create_time(),
            ppid,
            name,
            status,
            terminal,
            exe,
            cwd,
            cmdline,
            environ,
            uids,
            gids,
            username,
            num_threads,
            cpu_times,
            memory_bytes,
            warnings,
        })
    }
}
