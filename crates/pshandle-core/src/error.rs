//! Error types for pshandle operations.
//!
//! This module defines the error taxonomy shared by every accessor:
//! - [`PshandleError`] - Canonical error type for all pshandle operations
//!
//! ## Design Principles
//!
//! - **Structured**: Errors carry typed context (pid, operation) not just messages
//! - **Classified once**: Only failure triage in `pshandle-proc` decides which
//!   variant a failed read becomes; parsers and resolvers pass errno along
//! - **ABI-aligned**: Uses `u32` for PIDs (unsigned for cross-platform consistency)
//! - **Secure**: No sensitive information (paths, credentials) in error messages

use std::io;
use thiserror::Error;

// ============================================================================
// Canonical Error Type
// ============================================================================

/// Canonical error type for all pshandle operations.
///
/// ## Error Code Mapping
///
/// | Variant | Code |
/// |---------|------|
/// | `InvalidArgument` | 1 |
/// | `NoSuchProcess` | 2 |
/// | `ZombieProcess` | 3 |
/// | `AccessDenied` | 4 |
/// | `OutOfMemory` | 5 |
/// | `ParseFailure` | 6 |
/// | `NotSupported` | 7 |
/// | `System` | 8 |
#[derive(Debug, Error)]
pub enum PshandleError {
    /// Invalid argument provided.
    ///
    /// Returned when input validation fails (e.g., pid = 0, bad configuration).
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: String,
    },

    /// The PID does not denote the process the handle was opened for.
    ///
    /// Either nothing runs under the PID any more, or the PID was recycled
    /// and now belongs to an unrelated process.
    #[error("No such process: PID {pid}")]
    NoSuchProcess {
        /// The process ID that was looked up.
        pid: u32,
    },

    /// The process has exited and is waiting to be reaped by its parent.
    #[error("Process {pid} is a zombie")]
    ZombieProcess {
        /// The process ID of the zombie.
        pid: u32,
    },

    /// Permission denied while reading accounting data.
    ///
    /// The process may still be alive.
    #[error("Access denied for '{operation}' on PID {pid}")]
    AccessDenied {
        /// The process ID we attempted to inspect.
        pid: u32,
        /// The accessor that was denied (e.g., "environ", "exe").
        operation: String,
    },

    /// Allocation failure while buffering kernel data.
    #[error("Out of memory: {message}")]
    OutOfMemory {
        /// What was being buffered.
        message: String,
    },

    /// A kernel record did not have the expected shape.
    ///
    /// Not retryable: the record format is incompatible with this parser.
    #[error("Cannot parse {message}")]
    ParseFailure {
        /// Which record failed and how.
        message: String,
    },

    /// Operation not supported on the current platform.
    #[error("Operation '{feature}' not supported on {platform}")]
    NotSupported {
        /// The feature that is not supported.
        feature: String,
        /// The platform where it's not supported.
        platform: String,
    },

    /// Any other OS-level read error, with the original errno.
    #[error("System error: {message} (errno: {errno})")]
    System {
        /// Description of the error.
        message: String,
        /// The errno value.
        errno: i32,
    },
}

impl PshandleError {
    /// Get the numeric code for this error.
    pub fn error_code(&self) -> i32 {
        match self {
            PshandleError::InvalidArgument { .. } => 1,
            PshandleError::NoSuchProcess { .. } => 2,
            PshandleError::ZombieProcess { .. } => 3,
            PshandleError::AccessDenied { .. } => 4,
            PshandleError::OutOfMemory { .. } => 5,
            PshandleError::ParseFailure { .. } => 6,
            PshandleError::NotSupported { .. } => 7,
            PshandleError::System { .. } => 8,
        }
    }

    /// True when the error proves the handle's process no longer exists.
    ///
    /// Only `NoSuchProcess` qualifies. A zombie still exists until reaped.
    pub fn is_gone(&self) -> bool {
        matches!(self, PshandleError::NoSuchProcess { .. })
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl PshandleError {
    /// Create an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PshandleError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a `NoSuchProcess` error.
    pub fn no_such_process(pid: u32) -> Self {
        PshandleError::NoSuchProcess { pid }
    }

    /// Create a `ZombieProcess` error.
    pub fn zombie(pid: u32) -> Self {
        PshandleError::ZombieProcess { pid }
    }

    /// Create an `AccessDenied` error.
    pub fn access_denied(pid: u32, operation: impl Into<String>) -> Self {
        PshandleError::AccessDenied {
            pid,
            operation: operation.into(),
        }
    }

    /// Create an `OutOfMemory` error.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        PshandleError::OutOfMemory {
            message: message.into(),
        }
    }

    /// Create a `ParseFailure` error.
    pub fn parse_failure(message: impl Into<String>) -> Self {
        PshandleError::ParseFailure {
            message: message.into(),
        }
    }

    /// Create a `NotSupported` error.
    pub fn not_supported(feature: impl Into<String>, platform: impl Into<String>) -> Self {
        PshandleError::NotSupported {
            feature: feature.into(),
            platform: platform.into(),
        }
    }

    /// Create a `System` error.
    pub fn system(message: impl Into<String>, errno: i32) -> Self {
        PshandleError::System {
            message: message.into(),
            errno,
        }
    }

    /// Create a `System` error from an IO error, keeping its errno.
    ///
    /// Errors without an OS code (e.g., invalid UTF-8) carry errno 0.
    pub fn system_io(message: impl Into<String>, source: &io::Error) -> Self {
        PshandleError::System {
            message: format!("{}: {}", message.into(), source),
            errno: source.raw_os_error().unwrap_or(0),
        }
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for pshandle operations.
pub type PshandleResult<T> = Result<T, PshandleError>;

// ============================================================================
// Tests
// ============================================================================
