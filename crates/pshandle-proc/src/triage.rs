//! Failure triage.
//!
//! Readers hand back raw I/O errors; this module is the one place they are
//! turned into [`PshandleError`] variants. The important distinction is
//! between "the file is gone because the process is gone" and "the file is
//! unreadable although the process still exists" (kernel threads, zombies,
//! low system pids), which needs a second probe of the process directory.

use pshandle_core::PshandleError;
use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;

/// Outcome of a raw read before classification.
#[derive(Debug)]
pub(crate) enum FetchError {
    /// OS-level failure, to be classified by [`classify_read_failure`].
    Io(io::Error),
    /// Already classified (allocation failure, malformed record).
    Fatal(PshandleError),
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        FetchError::Io(err)
    }
}

/// True for errors that may mean the process vanished.
///
/// Empty or truncated records count: a process exiting mid-read can leave
/// nothing behind.
fn may_be_gone(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENOENT) | Some(libc::ESRCH))
        || err.kind() == io::ErrorKind::UnexpectedEof
}

fn is_permission(errno: Option<i32>) -> bool {
    matches!(errno, Some(libc::EPERM) | Some(libc::EACCES))
}

/// Classify a failed read of a per-process file.
///
/// - file absent, `pid_dir` absent: `NoSuchProcess`
/// - file absent, `pid_dir` present: `System` with the original errno
/// - permission denied on either probe: `AccessDenied`
/// - anything else: `System` with the errno that failed
pub fn classify_read_failure(
    err: &io::Error,
    pid: u32,
    pid_dir: &Path,
    operation: &str,
) -> PshandleError {
    let errno = err.raw_os_error();

    let classified = if may_be_gone(err) {
        match fs::symlink_metadata(pid_dir) {
            Ok(_) => PshandleError::system_io(
                format!("{} unavailable although PID {} exists", operation, pid),
                err,
            ),
            Err(probe) => match probe.raw_os_error() {
                Some(libc::ENOENT) | Some(libc::ESRCH) => PshandleError::no_such_process(pid),
                code if is_permission(code) => PshandleError::access_denied(pid, operation),
                _ => PshandleError::system_io(format!("probe PID {}", pid), &probe),
            },
        }
    } else if is_permission(errno) {
        PshandleError::access_denied(pid, operation)
    } else {
        PshandleError::system_io(format!("read {} of PID {}", operation, pid), err)
    };

    trace!(pid, operation, ?errno, outcome = %classified, "triaged read failure");
    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errno(code: i32) -> io::Error {
        io::Error::from_raw_os_error(code)
    }

    #[test]
    fn test_file_and_dir_absent_is_no_such_process() {
        let root = tempfile::tempdir().unwrap();
        let err = classify_read_failure(&errno(libc::ENOENT), 77, &root.path().join("77"), "stat");
        assert!(matches!(err, PshandleError::NoSuchProcess { pid: 77 }));
    }

    #[test]
    fn test_file_absent_dir_present_is_not_identity_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("77");
        fs::create_dir(&dir).unwrap();

        let err = classify_read_failure(&errno(libc::ENOENT), 77, &dir, "exe");
        match err {
            PshandleError::System { errno, .. } => assert_eq!(errno, libc::ENOENT),
            other => panic!("expected System, got {other:?}"),
        }
    }

    #[test]
    fn test_esrch_behaves_like_enoent() {
        let root = tempfile::tempdir().unwrap();
        let err = classify_read_failure(&errno(libc::ESRCH), 5, &root.path().join("5"), "cwd");
        assert!(err.is_gone());
    }

    #[test]
    fn test_truncated_read_probes_directory() {
        let root = tempfile::tempdir().unwrap();
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "empty stat record");
        let err = classify_read_failure(&eof, 9, &root.path().join("9"), "stat");
        assert!(err.is_gone());
    }

    #[test]
    fn test_permission_denied_is_access_denied() {
        let root = tempfile::tempdir().unwrap();
        for code in [libc::EACCES, libc::EPERM] {
            let err = classify_read_failure(&errno(code), 3, &root.path().join("3"), "environ");
            match err {
                PshandleError::AccessDenied { pid, operation } => {
                    assert_eq!(pid, 3);
                    assert_eq!(operation, "environ");
                }
                other => panic!("expected AccessDenied, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_other_errno_is_system_with_code() {
        let root = tempfile::tempdir().unwrap();
        let err = classify_read_failure(&errno(libc::EIO), 3, &root.path().join("3"), "stat");
        match err {
            PshandleError::System { errno, .. } => assert_eq!(errno, libc::EIO),
            other => panic!("expected System, got {other:?}"),
        }
    }
}
