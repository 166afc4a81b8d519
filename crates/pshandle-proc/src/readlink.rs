//! Symlink resolution for `/proc/[pid]/exe` and `/proc/[pid]/cwd`.
//!
//! `readlink(2)` silently truncates when the buffer is too small, so a
//! result that exactly fills the buffer is ambiguous. The buffer doubles
//! until the target fits or the configured bound is reached.

use crate::triage::FetchError;
use pshandle_core::PshandleError;
use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Suffix the kernel appends when the link target was unlinked.
pub const DELETED_SUFFIX: &str = " (deleted)";

/// Resolve `path` with a buffer starting at `initial` bytes, growing up to `max`.
///
/// The result stops at the first null byte; anything the kernel leaves
/// after it is not part of the path.
pub(crate) fn resolve_link(path: &Path, initial: usize, max: usize) -> Result<PathBuf, FetchError> {
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        FetchError::Fatal(PshandleError::invalid_argument("link path contains a null byte"))
    })?;

    let mut size = initial.max(1);
    loop {
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| {
            FetchError::Fatal(PshandleError::out_of_memory(format!(
                "readlink buffer of {} bytes",
                size
            )))
        })?;
        buf.resize(size, 0);

        let ret = unsafe {
            libc::readlink(
                c_path.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_char,
                buf.len(),
            )
        };

        if ret < 0 {
            return Err(FetchError::Io(io::Error::last_os_error()));
        }
        let len = ret as usize;
        if len == 0 {
            return Err(FetchError::Io(io::Error::from_raw_os_error(libc::ENOENT)));
        }

        if len < size {
            buf.truncate(len);
            if let Some(nul) = buf.iter().position(|&b| b == 0) {
                buf.truncate(nul);
            }
            return Ok(PathBuf::from(OsString::from_vec(buf)));
        }

        // Filled the buffer: the target may have been cut short.
        if size >= max {
            return Err(FetchError::Io(io::Error::from_raw_os_error(
                libc::ENAMETOOLONG,
            )));
        }
        size = size.saturating_mul(2).min(max);
        trace!(path = %path.display(), size, "growing readlink buffer");
    }
}

/// Remove the kernel's `" (deleted)"` marker from a resolved path.
///
/// # Example
///
/// ```rust
/// use pshandle_proc::strip_deleted_suffix;
/// use std::path::Path;
///
/// assert_eq!(
///     strip_deleted_suffix(Path::new("/usr/bin/app (deleted)")),
///     Path::new("/usr/bin/app")
/// );
/// ```
pub fn strip_deleted_suffix(path: &Path) -> PathBuf {
    let bytes = path.as_os_str().as_bytes();
    match bytes.strip_suffix(DELETED_SUFFIX.as_bytes()) {
        Some(stripped) => PathBuf::from(OsString::from_vec(stripped.to_vec())),
        None => path.to_path_buf(),
    }
}
