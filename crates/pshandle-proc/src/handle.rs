//! Process handles and the identity protocol.
//!
//! A [`ProcessHandle`] is a PID plus the creation time observed when it was
//! opened. PIDs are recycled, so the creation time is the only proof that
//! the PID still names the same process: every accessor re-reads
//! `/proc/[pid]/stat`, recomputes the creation time and refuses to answer
//! (`NoSuchProcess`) when it differs.
//!
//! This detects reuse after the fact; it cannot stop the kernel from
//! recycling the PID between two reads. Each accessor therefore validates
//! after fetching its data, so data read from a recycled PID is discarded.

use crate::procfs::Procfs;
use crate::records::{parse_id_triple, parse_statm, split_cmdline, split_environ};
use crate::stat::StatRecord;
use crate::triage::FetchError;
use crate::users::lookup_username;
use crate::{CpuTimes, IdTriple, MemoryInfo, ProcessStatus, ProcessSummary};
use pshandle_core::{PshandleError, PshandleResult};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Largest PID accepted; avoids negative `pid_t` semantics.
pub const MAX_SAFE_PID: u32 = i32::MAX as u32;

/// Placeholder name used by [`ProcessHandle::format`] for unreadable processes.
pub const UNKNOWN_NAME: &str = "???";

/// A PID-reuse-safe reference to one process.
///
/// Cheap to clone; all fields except the `presumed_gone` hint are immutable.
#[derive(Debug)]
pub struct ProcessHandle {
    procfs: Arc<Procfs>,
    pid: u32,
    create_time: f64,
    presumed_gone: AtomicBool,
}

fn validate_pid(pid: u32) -> PshandleResult<()> {
    if pid == 0 {
        return Err(PshandleError::invalid_argument("PID 0 is not valid"));
    }
    if pid > MAX_SAFE_PID {
        return Err(PshandleError::invalid_argument(format!(
            "PID {} exceeds maximum safe value {}",
            pid, MAX_SAFE_PID
        )));
    }
    Ok(())
}

fn fetch_stat(procfs: &Procfs, pid: u32) -> PshandleResult<StatRecord> {
    procfs.read_stat(pid).map_err(|failure| match failure {
        FetchError::Io(err) => procfs.classify(&err, pid, "stat"),
        FetchError::Fatal(err) => err,
    })
}

impl ProcessHandle {
    /// Open a handle for `pid`.
    ///
    /// Without `create_time` the stat record is read now and its creation
    /// time becomes the handle's identity; a failed read aborts with the
    /// triaged error. With `create_time` (e.g. a handle serialized earlier)
    /// nothing is read, and the handle may already refer to a gone process.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for PID 0, PIDs above [`MAX_SAFE_PID`], or a
    /// non-finite `create_time`. Returns `NoSuchProcess` if the PID does not
    /// exist.
    pub fn open(procfs: &Arc<Procfs>, pid: u32, create_time: Option<f64>) -> PshandleResult<Self> {
        validate_pid(pid)?;

        let create_time = match create_time {
            Some(t) if t.is_finite() => t,
            Some(t) => {
                return Err(PshandleError::invalid_argument(format!(
                    "create_time {} is not finite",
                    t
                )))
            }
            None => {
                let record = fetch_stat(procfs, pid)?;
                procfs.calibration()?.creation_timestamp(record.starttime)
            }
        };

        Ok(ProcessHandle {
            procfs: Arc::clone(procfs),
            pid,
            create_time,
            presumed_gone: AtomicBool::new(false),
        })
    }

    /// Open a handle for the calling process.
    pub fn current(procfs: &Arc<Procfs>) -> PshandleResult<Self> {
        Self::open(procfs, std::process::id(), None)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Creation time in epoch seconds; the handle's identity witness.
    pub fn create_time(&self) -> f64 {
        self.create_time
    }

    pub fn procfs(&self) -> &Arc<Procfs> {
        &self.procfs
    }

    /// Hint set once an accessor or `is_running()` has found the process gone
    /// or its PID recycled.
    ///
    /// Never consulted by the accessors themselves; they always re-read.
    pub fn presumed_gone(&self) -> bool {
        self.presumed_gone.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------------
    // Identity protocol
    // ------------------------------------------------------------------------

    /// Does `record` belong to the process this handle was opened for?
    fn same_process(&self, record: &StatRecord) -> PshandleResult<bool> {
        let current = self
            .procfs
            .calibration()?
            .creation_timestamp(record.starttime);
        Ok(current == self.create_time)
    }

    /// Fresh stat record, only if it still belongs to this handle.
    fn checked_stat(&self) -> PshandleResult<StatRecord> {
        let record = fetch_stat(&self.procfs, self.pid)?;
        if !self.same_process(&record)? {
            debug!(
                pid = self.pid,
                create_time = self.create_time,
                "PID now belongs to a different process"
            );
            return Err(PshandleError::no_such_process(self.pid));
        }
        Ok(record)
    }

    /// Like [`Self::checked_stat`], additionally refusing zombies.
    fn live_stat(&self) -> PshandleResult<StatRecord> {
        let record = self.checked_stat()?;
        if record.is_zombie() {
            debug!(pid = self.pid, "process is a zombie");
            return Err(PshandleError::zombie(self.pid));
        }
        Ok(record)
    }

    /// Explain why reading one of this process's files failed.
    ///
    /// Gone or recycled wins over zombie, which wins over the triage of the
    /// original error.
    fn explain(&self, failure: FetchError, operation: &str) -> PshandleError {
        let err = match failure {
            FetchError::Io(err) => err,
            FetchError::Fatal(err) => return err,
        };
        match self.live_stat() {
            Ok(_) => self.procfs.classify(&err, self.pid, operation),
            Err(identity) => identity,
        }
    }

    fn observe<T>(&self, result: PshandleResult<T>) -> PshandleResult<T> {
        if let Err(err) = &result {
            if err.is_gone() {
                self.presumed_gone.store(true, Ordering::Relaxed);
            }
        }
        result
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Whether the PID still names the process this handle was opened for.
    ///
    /// Never fails: any error reads as `false`. This is creation-time
    /// equality only, so a zombie that has not been reaped yet is still
    /// running by this definition.
    pub fn is_running(&self) -> bool {
        match self.procfs.read_stat(self.pid) {
            Ok(record) => match self.same_process(&record) {
                Ok(true) => true,
                Ok(false) => {
                    self.presumed_gone.store(true, Ordering::Relaxed);
                    false
                }
                Err(_) => false,
            },
            Err(FetchError::Io(err)) => {
                if self.procfs.classify(&err, self.pid, "stat").is_gone() {
                    self.presumed_gone.store(true, Ordering::Relaxed);
                }
                false
            }
            Err(FetchError::Fatal(_)) => false,
        }
    }

    /// Parent PID.
    pub fn ppid(&self) -> PshandleResult<u32> {
        self.observe(self.checked_stat().map(|r| r.ppid.max(0) as u32))
    }

    /// Open a new handle for the parent process.
    ///
    /// Racy by nature: the parent can exit, and its PID be recycled, between
    /// reading the parent PID and opening the new handle. The returned handle
    /// then refers to whatever process held the PID at that moment. Callers
    /// that care should compare the parent's creation time with this
    /// process's.
    ///
    /// Returns `NoSuchProcess` with PID 0 when the process has no parent.
    pub fn parent(&self) -> PshandleResult<ProcessHandle> {
        let ppid = self.ppid()?;
        if ppid == 0 {
            return Err(PshandleError::no_such_process(0));
        }
        ProcessHandle::open(&self.procfs, ppid, None)
    }

    /// Command name from the stat record (at most 15 bytes on Linux).
    pub fn name(&self) -> PshandleResult<String> {
        self.observe(self.checked_stat().map(|r| r.name))
    }

    /// Run-state category. Unrecognized state codes are a `ParseFailure`.
    pub fn status(&self) -> PshandleResult<ProcessStatus> {
        self.observe(self.checked_stat().and_then(|r| {
            ProcessStatus::from_code(r.state).ok_or_else(|| {
                PshandleError::parse_failure(format!("stat record: unknown state '{}'", r.state))
            })
        }))
    }

    /// Controlling terminal device number, `None` without a terminal.
    pub fn terminal(&self) -> PshandleResult<Option<i32>> {
        self.observe(
            self.checked_stat()
                .map(|r| if r.tty_nr == 0 { None } else { Some(r.tty_nr) }),
        )
    }

    /// Number of threads. Refuses zombies.
    pub fn num_threads(&self) -> PshandleResult<u32> {
        self.observe(self.live_stat().and_then(|r| {
            u32::try_from(r.num_threads).map_err(|_| {
                PshandleError::parse_failure(format!(
                    "stat record: thread count {}",
                    r.num_threads
                ))
            })
        }))
    }

    /// CPU times in seconds. Refuses zombies.
    pub fn cpu_times(&self) -> PshandleResult<CpuTimes> {
        self.observe(self.cpu_times_inner())
    }

    fn cpu_times_inner(&self) -> PshandleResult<CpuTimes> {
        let record = self.live_stat()?;
        let cal = self.procfs.calibration()?;
        Ok(CpuTimes {
            user: cal.ticks_to_seconds(record.utime as f64),
            system: cal.ticks_to_seconds(record.stime as f64),
            children_user: cal.ticks_to_seconds(record.cutime as f64),
            children_system: cal.ticks_to_seconds(record.cstime as f64),
        })
    }

    /// Memory counters in pages. Refuses zombies.
    pub fn memory_info(&self) -> PshandleResult<MemoryInfo> {
        self.observe(self.memory_info_inner())
    }

    fn memory_info_inner(&self) -> PshandleResult<MemoryInfo> {
        let hint = self.procfs.config().statm_read_hint;
        let raw = self
            .procfs
            .read_pid_file(self.pid, "statm", hint)
            .map_err(|f| self.explain(f, "statm"))?;
        self.live_stat()?;
        parse_statm(&String::from_utf8_lossy(&raw))
    }

    /// Command line arguments.
    ///
    /// Empty for kernel threads. A zombie has lost its arguments and reports
    /// `ZombieProcess` instead.
    pub fn cmdline(&self) -> PshandleResult<Vec<String>> {
        let hint = self.procfs.config().cmdline_read_hint;
        self.observe(self.read_list("cmdline", hint, split_cmdline))
    }

    /// Environment as `KEY=VALUE` entries.
    pub fn environ(&self) -> PshandleResult<Vec<String>> {
        let hint = self.procfs.config().environ_read_hint;
        self.observe(self.read_list("environ", hint, split_environ))
    }

    fn read_list(
        &self,
        leaf: &str,
        hint: usize,
        split: fn(&[u8]) -> Vec<String>,
    ) -> PshandleResult<Vec<String>> {
        let blob = self
            .procfs
            .read_pid_file(self.pid, leaf, hint)
            .map_err(|f| self.explain(f, leaf))?;
        if blob.is_empty() {
            self.live_stat()?;
        } else {
            self.checked_stat()?;
        }
        Ok(split(&blob))
    }

    /// Path of the running executable.
    ///
    /// `None` when the link cannot be resolved although the process exists
    /// and is not a zombie (kernel threads). The path may end in
    /// `" (deleted)"`; see [`crate::strip_deleted_suffix`].
    pub fn exe(&self) -> PshandleResult<Option<PathBuf>> {
        self.observe(self.exe_inner())
    }

    fn exe_inner(&self) -> PshandleResult<Option<PathBuf>> {
        match self.procfs.read_pid_link(self.pid, "exe") {
            Ok(path) => {
                self.checked_stat()?;
                Ok(Some(path))
            }
            Err(FetchError::Io(err))
                if matches!(err.raw_os_error(), Some(libc::ENOENT) | Some(libc::ESRCH)) =>
            {
                self.live_stat()?;
                Ok(None)
            }
            Err(failure) => Err(self.explain(failure, "exe")),
        }
    }

    /// Current working directory.
    pub fn cwd(&self) -> PshandleResult<PathBuf> {
        self.observe(self.cwd_inner())
    }

    fn cwd_inner(&self) -> PshandleResult<PathBuf> {
        let path = self
            .procfs
            .read_pid_link(self.pid, "cwd")
            .map_err(|f| self.explain(f, "cwd"))?;
        self.checked_stat()?;
        Ok(path)
    }

    /// Real, effective and saved user ids.
    pub fn uids(&self) -> PshandleResult<IdTriple> {
        self.observe(self.id_triple("Uid:"))
    }

    /// Real, effective and saved group ids.
    pub fn gids(&self) -> PshandleResult<IdTriple> {
        self.observe(self.id_triple("Gid:"))
    }

    fn id_triple(&self, label: &str) -> PshandleResult<IdTriple> {
        let hint = self.procfs.config().status_read_hint;
        let raw = self
            .procfs
            .read_pid_file(self.pid, "status", hint)
            .map_err(|f| self.explain(f, "status"))?;
        self.checked_stat()?;
        parse_id_triple(&String::from_utf8_lossy(&raw), label)
    }

    /// Account name of the real user id; `None` without a passwd entry.
    pub fn username(&self) -> PshandleResult<Option<String>> {
        let uids = self.uids()?;
        lookup_username(uids.real)
    }

    /// Describe the handle for logs and printing.
    ///
    /// Never fails. A process that cannot be read, whose identity cannot be
    /// confirmed, or whose PID now belongs to another process, is shown as `"???"` with status `"terminated"`.
    /// An unrecognized state code shows as `"unknown"`.
    pub fn format(&self) -> ProcessSummary {
        let described = match self.procfs.read_stat(self.pid) {
            Ok(record) if matches!(self.same_process(&record), Ok(true)) => Some((
                record.name,
                ProcessStatus::from_code(record.state).map_or("unknown", |s| s.as_str()),
            )),
            _ => None,
        };
        let (name, status) = described.unwrap_or_else(|| (UNKNOWN_NAME.to_string(), "terminated"));

        ProcessSummary {
            name,
            pid: self.pid,
            create_time: self.create_time,
            status: status.to_string(),
        }
    }
}

impl Clone for ProcessHandle {
    fn clone(&self) -> Self {
        ProcessHandle {
            procfs: Arc::clone(&self.procfs),
            pid: self.pid,
            create_time: self.create_time,
            presumed_gone: AtomicBool::new(self.presumed_gone()),
        }
    }
}

/// Handles are equal when they name the same process incarnation.
impl PartialEq for ProcessHandle {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.create_time == other.create_time
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.format(), f)
    }
}
