//! Liveness probes and ancestor walks built on handles.

use crate::handle::ProcessHandle;
use crate::{current_timestamp, ProcessSummary};
use pshandle_core::schema::{ANCESTORS_RESULT_V1, RUNNING_RESULT_V1};
use pshandle_core::{get_platform, PshandleResult};
use serde::Serialize;
use tracing::debug;

/// Ancestor walks stop after this many levels.
pub const MAX_ANCESTOR_DEPTH: usize = 4096;

/// Result of a liveness probe.
#[derive(Debug, Clone, Serialize)]
pub struct RunningResult {
    /// Schema identifier for version detection.
    pub schema_id: &'static str,

    /// Timestamp of result creation (ISO 8601).
    pub timestamp: String,

    /// Current platform.
    pub platform: &'static str,

    pub pid: u32,

    /// Creation time the probe compared against.
    pub create_time: f64,

    /// True if the PID still names the process created at `create_time`.
    pub running: bool,
}

/// Result of an ancestor walk.
#[derive(Debug, Clone, Serialize)]
pub struct AncestorsResult {
    /// Schema identifier for version detection.
    pub schema_id: &'static str,

    /// Timestamp (ISO 8601).
    pub timestamp: String,

    /// Platform identifier.
    pub platform: &'static str,

    /// The process the walk started from.
    pub process: ProcessSummary,

    /// Parent first, then its parent, up to the root.
    pub ancestors: Vec<ProcessSummary>,

    /// Why the walk stopped early, if it did.
    pub warnings: Vec<String>,
}

/// Probe whether `handle` still names its process.
pub fn running(handle: &ProcessHandle) -> RunningResult {
    RunningResult {
        schema_id: RUNNING_RESULT_V1,
        timestamp: current_timestamp(),
        platform: get_platform(),
        pid: handle.pid(),
        create_time: handle.create_time(),
        running: handle.is_running(),
    }
}

/// Walk parents from `handle` to the root of the process tree.
///
/// The walk is racy: an ancestor may exit while it is in progress. An
/// ancestor that cannot be opened ends the walk with a warning.
///
/// # Errors
///
/// Fails only when `handle` itself cannot report its parent.
pub fn ancestors(handle: &ProcessHandle) -> PshandleResult<AncestorsResult> {
    let mut ancestors = Vec::new();
    let mut warnings = Vec::new();

    let mut ppid = handle.ppid()?;
    while ppid != 0 {
        if ancestors.len() >= MAX_ANCESTOR_DEPTH {
            warnings.push(format!(
                "Stopped after {} ancestors; the parent chain may be cyclic",
                MAX_ANCESTOR_DEPTH
            ));
            break;
        }

        let parent = match ProcessHandle::open(handle.procfs(), ppid, None) {
            Ok(parent) => parent,
            Err(err) => {
                debug!(pid = ppid, error = %err, "ancestor walk stopped");
                warnings.push(format!("PID {}: {}", ppid, err));
                break;
            }
        };
        ancestors.push(parent.format());

        ppid = match parent.ppid() {
            Ok(next) => next,
            Err(err) => {
                warnings.push(format!("PID {}: {}", parent.pid(), err));
                break;
            }
        };
    }

    Ok(AncestorsResult {
        schema_id: ANCESTORS_RESULT_V1,
        timestamp: current_timestamp(),
        platform: get_platform(),
        process: handle.format(),
        ancestors,
        warnings,
    })
}
