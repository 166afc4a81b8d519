//! Boot calibration constants.
//!
//! Kernel start times are tick counts since boot. Turning them into wall-clock
//! timestamps needs the boot time (the `btime` line of `/proc/stat`) and the
//! clock-tick frequency (`sysconf(_SC_CLK_TCK)`). Both are fixed for the
//! running kernel, so each is computed at most once per [`crate::Procfs`].

use pshandle_core::{PshandleError, PshandleResult};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Boot time and tick frequency of the running kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    boot_time: f64,
    clock_ticks: f64,
}

impl Calibration {
    pub fn new(boot_time: f64, clock_ticks: f64) -> Self {
        Calibration {
            boot_time,
            clock_ticks,
        }
    }

    /// Wall-clock seconds since the epoch at which the kernel booted.
    pub fn boot_time(&self) -> f64 {
        self.boot_time
    }

    /// Clock ticks per second used by the kernel's tick counters.
    pub fn clock_ticks_per_second(&self) -> f64 {
        self.clock_ticks
    }

    /// Convert a start time in ticks since boot into epoch seconds.
    ///
    /// Deterministic for a given tick count, so two results can be compared
    /// with `==`.
    pub fn creation_timestamp(&self, start_ticks: u64) -> f64 {
        self.boot_time + start_ticks as f64 / self.clock_ticks
    }

    /// Convert a tick counter into seconds.
    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks / self.clock_ticks
    }
}

/// Lazily filled calibration values.
///
/// A failed computation leaves the cell empty, so the next call retries.
/// Concurrent first calls may both compute; they produce the same value and
/// the first stored one wins.
#[derive(Debug, Default)]
pub(crate) struct CalibrationCache {
    boot_time: OnceLock<f64>,
    clock_ticks: OnceLock<f64>,
}

impl CalibrationCache {
    pub(crate) fn boot_time(&self, root: &Path) -> PshandleResult<f64> {
        get_or_try_init(&self.boot_time, || read_boot_time(root))
    }

    pub(crate) fn clock_ticks(&self) -> PshandleResult<f64> {
        get_or_try_init(&self.clock_ticks, clock_ticks_per_second)
    }
}

fn get_or_try_init(
    cell: &OnceLock<f64>,
    init: impl FnOnce() -> PshandleResult<f64>,
) -> PshandleResult<f64> {
    if let Some(value) = cell.get() {
        return Ok(*value);
    }
    let value = init()?;
    Ok(*cell.get_or_init(|| value))
}

/// Read the boot time from `<root>/stat`.
fn read_boot_time(root: &Path) -> PshandleResult<f64> {
    let path = root.join("stat");
    let content = fs::read_to_string(&path)
        .map_err(|e| PshandleError::system_io("read kernel statistics", &e))?;

    parse_boot_time(&content)
        .map(|btime| btime as f64)
        .ok_or_else(|| PshandleError::system("no btime line in kernel statistics", 0))
}

/// Find the `btime` line and parse its value.
pub(crate) fn parse_boot_time(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|rest| rest.trim().parse().ok())
}

/// Clock ticks per second (usually 100 on Linux).
fn clock_ticks_per_second() -> PshandleResult<f64> {
    let result = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if result <= 0 {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(PshandleError::system("sysconf(_SC_CLK_TCK) failed", errno));
    }
    Ok(result as f64)
}

/// Page size assumed when `sysconf` cannot report one.
const FALLBACK_PAGE_SIZE: u64 = 4096;

static PAGE_SIZE: OnceLock<u64> = OnceLock::new();

/// Bytes per page, for converting `statm` counters.
///
/// Queried once per process. A non-positive answer, or one that is not a
/// power of two, is replaced by [`FALLBACK_PAGE_SIZE`].
pub fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(|| match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 && (n as u64).is_power_of_two() => n as u64,
        _ => FALLBACK_PAGE_SIZE,
    })
}
