//! Schema ID constants for JSON output contracts.
//!
//! Every JSON document pshandle emits carries a `schema_id` field naming the
//! shape it follows, so consumers can detect version changes.
//!
//! ## URI Structure
//!
//! ```text
//! https://schemas.pshandle.dev/<module>/<topic>/<version>/<filename>
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pshandle_core::schema::PROCESS_REPORT_V1;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Report {
//!     schema_id: &'static str,
//!     pid: u32,
//! }
//!
//! let report = Report { schema_id: PROCESS_REPORT_V1, pid: 1 };
//! ```

/// Schema ID for the full per-handle report (`pshandle inspect --json`).
pub const PROCESS_REPORT_V1: &str =
    "https://schemas.pshandle.dev/pshandle/process/v1.0.0/process-report.schema.json";

/// Schema ID for the ancestor chain (`pshandle ancestors --json`).
pub const ANCESTORS_RESULT_V1: &str =
    "https://schemas.pshandle.dev/pshandle/process/v1.0.0/ancestors-result.schema.json";

/// Schema ID for a liveness probe (`pshandle running --json`).
pub const RUNNING_RESULT_V1: &str =
    "https://schemas.pshandle.dev/pshandle/process/v1.0.0/running-result.schema.json";

// ============================================================================
// Schema Host Constants
// ============================================================================

/// Base URL for pshandle schemas.
pub const SCHEMA_HOST: &str = "https://schemas.pshandle.dev";

/// Module name for pshandle in schema URIs.
pub const SCHEMA_MODULE: &str = "pshandle";
