//! Configuration for the `/proc` context.
//!
//! [`ProcfsConfig`] is accepted as JSON (for example from `pshandle --config`)
//! and validated before a [`crate::Procfs`] is built from it. Unknown fields
//! are rejected.

use pshandle_core::{PshandleError, PshandleResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default mount point of the process pseudo-filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default initial reservation for `/proc/[pid]/stat` reads.
pub const DEFAULT_STAT_READ_HINT: usize = 2048;

/// Default initial reservation for `/proc/[pid]/cmdline` reads.
pub const DEFAULT_CMDLINE_READ_HINT: usize = 1024;

/// Default initial reservation for `/proc/[pid]/environ` reads.
pub const DEFAULT_ENVIRON_READ_HINT: usize = 32 * 1024;

/// Default initial reservation for `/proc/[pid]/status` reads.
pub const DEFAULT_STATUS_READ_HINT: usize = 2048;

/// Default initial reservation for `/proc/[pid]/statm` reads.
pub const DEFAULT_STATM_READ_HINT: usize = 1024;

/// Default first buffer size of the symlink resolver.
pub const DEFAULT_READLINK_INITIAL: usize = 1024;

/// Default upper bound of the symlink resolver buffer.
pub const DEFAULT_READLINK_MAX: usize = 64 * 1024;

/// Settings for reading the process pseudo-filesystem.
///
/// All fields are optional in JSON input and fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcfsConfig {
    /// Mount point of the pseudo-filesystem.
    pub root: PathBuf,

    /// Initial buffer reservation for the stat record.
    pub stat_read_hint: usize,

    /// Initial buffer reservation for the command line blob.
    pub cmdline_read_hint: usize,

    /// Initial buffer reservation for the environment blob.
    pub environ_read_hint: usize,

    /// Initial buffer reservation for the labeled status record.
    pub status_read_hint: usize,

    /// Initial buffer reservation for the memory record.
    pub statm_read_hint: usize,

    /// First buffer size tried when resolving a symlink.
    pub readlink_initial: usize,

    /// Largest buffer the symlink resolver grows to before giving up.
    pub readlink_max: usize,
}

impl Default for ProcfsConfig {
    fn default() -> Self {
        ProcfsConfig {
            root: PathBuf::from(DEFAULT_PROC_ROOT),
            stat_read_hint: DEFAULT_STAT_READ_HINT,
            cmdline_read_hint: DEFAULT_CMDLINE_READ_HINT,
            environ_read_hint: DEFAULT_ENVIRON_READ_HINT,
            status_read_hint: DEFAULT_STATUS_READ_HINT,
            statm_read_hint: DEFAULT_STATM_READ_HINT,
            readlink_initial: DEFAULT_READLINK_INITIAL,
            readlink_max: DEFAULT_READLINK_MAX,
        }
    }
}

impl ProcfsConfig {
    /// Default settings reading from a different mount point.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        ProcfsConfig {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> PshandleResult<Self> {
        let config: ProcfsConfig = serde_json::from_str(json)
            .map_err(|e| PshandleError::invalid_argument(format!("procfs config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Returns an error if any values are out of range.
    pub fn validate(&self) -> PshandleResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(PshandleError::invalid_argument("root must not be empty"));
        }

        let hints = [
            ("stat_read_hint", self.stat_read_hint),
            ("cmdline_read_hint", self.cmdline_read_hint),
            ("environ_read_hint", self.environ_read_hint),
            ("status_read_hint", self.status_read_hint),
            ("statm_read_hint", self.statm_read_hint),
            ("readlink_initial", self.readlink_initial),
        ];
        for (name, value) in hints {
            if value == 0 {
                return Err(PshandleError::invalid_argument(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if self.readlink_initial > self.readlink_max {
            return Err(PshandleError::invalid_argument(format!(
                "readlink_initial ({}) exceeds readlink_max ({})",
                self.readlink_initial, self.readlink_max
            )));
        }

        Ok(())
    }
}
