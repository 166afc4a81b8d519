//! pshandle-core: Core types, errors, and platform detection
//!
//! This crate provides the foundational types used across all pshandle crates:
//! - The error taxonomy shared by every process accessor
//! - Schema ID constants for JSON output contracts
//! - Platform detection utilities
//!
//! ## Error Handling
//!
//! pshandle uses a single canonical error type [`PshandleError`]. Failure
//! triage in `pshandle-proc` is the only place an OS error is turned into one
//! of its variants, so every accessor classifies failures the same way.
//!
//! ## Schema Integration
//!
//! JSON outputs include `schema_id` fields. See the [`schema`] module for
//! constants.

use std::env::consts::OS;

pub mod error;
pub mod schema;

// Re-export canonical error type at crate root
pub use error::{PshandleError, PshandleResult};

// ============================================================================
// Platform Detection
// ============================================================================

/// Get the current platform identifier.
///
/// Returns one of: "linux", "macos", "windows", "freebsd", etc.
#[inline]
pub fn get_platform() -> &'static str {
    OS
}

/// Check if the accounting back-end is available on this platform.
///
/// Only the Linux `/proc` layout is implemented.
#[inline]
#[cfg(target_os = "linux")]
pub const fn is_supported() -> bool {
    true
}

#[inline]
#[cfg(not(target_os = "linux"))]
pub const fn is_supported() -> bool {
    false
}
