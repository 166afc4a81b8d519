//! The `/proc` context shared by all handles.

use crate::calibration::{Calibration, CalibrationCache};
use crate::config::ProcfsConfig;
use crate::readlink::resolve_link;
use crate::stat::{parse_stat, StatParseError, StatRecord};
use crate::triage::{classify_read_failure, FetchError};
use pshandle_core::{PshandleError, PshandleResult};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Owner of the pseudo-filesystem settings and the calibration cache.
///
/// Handles keep an `Arc<Procfs>`; create one per mount point and share it.
///
/// # Example
///
/// ```rust,no_run
/// use pshandle_proc::{ProcessHandle, Procfs};
/// use std::sync::Arc;
///
/// let procfs = Arc::new(Procfs::new());
/// let me = ProcessHandle::current(&procfs).unwrap();
/// assert!(me.is_running());
/// ```
#[derive(Debug, Default)]
pub struct Procfs {
    config: ProcfsConfig,
    calibration: CalibrationCache,
}

impl Procfs {
    /// Context for the system `/proc` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a validated configuration.
    pub fn with_config(config: ProcfsConfig) -> PshandleResult<Self> {
        config.validate()?;
        Ok(Procfs {
            config,
            calibration: CalibrationCache::default(),
        })
    }

    pub fn config(&self) -> &ProcfsConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Directory of one process, e.g. `/proc/42`.
    pub fn pid_dir(&self, pid: u32) -> PathBuf {
        self.config.root.join(pid.to_string())
    }

    /// Boot time in epoch seconds; computed once, retried after failure.
    pub fn boot_time(&self) -> PshandleResult<f64> {
        self.calibration.boot_time(&self.config.root)
    }

    /// Clock ticks per second; computed once, retried after failure.
    pub fn clock_ticks_per_second(&self) -> PshandleResult<f64> {
        self.calibration.clock_ticks()
    }

    pub fn calibration(&self) -> PshandleResult<Calibration> {
        Ok(Calibration::new(
            self.boot_time()?,
            self.clock_ticks_per_second()?,
        ))
    }

    /// Classify a failed read of one of `pid`'s files.
    pub fn classify(&self, err: &io::Error, pid: u32, operation: &str) -> PshandleError {
        classify_read_failure(err, pid, &self.pid_dir(pid), operation)
    }

    pub(crate) fn read_stat(&self, pid: u32) -> Result<StatRecord, FetchError> {
        let raw = self.read_pid_file(pid, "stat", self.config.stat_read_hint)?;
        parse_stat(&raw).map_err(|e| match e {
            StatParseError::Truncated => FetchError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty stat record",
            )),
            StatParseError::Malformed(msg) => FetchError::Fatal(PshandleError::parse_failure(msg)),
        })
    }

    /// Read a whole per-process file, reserving `hint` bytes up front.
    pub(crate) fn read_pid_file(
        &self,
        pid: u32,
        leaf: &str,
        hint: usize,
    ) -> Result<Vec<u8>, FetchError> {
        read_bounded(&self.pid_dir(pid).join(leaf), hint)
    }

    pub(crate) fn read_pid_link(&self, pid: u32, leaf: &str) -> Result<PathBuf, FetchError> {
        resolve_link(
            &self.pid_dir(pid).join(leaf),
            self.config.readlink_initial,
            self.config.readlink_max,
        )
    }
}

fn read_bounded(path: &Path, hint: usize) -> Result<Vec<u8>, FetchError> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    buf.try_reserve(hint).map_err(|_| {
        FetchError::Fatal(PshandleError::out_of_memory(format!(
            "read buffer of {} bytes",
            hint
        )))
    })?;
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
