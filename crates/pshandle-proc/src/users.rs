//! Account name lookup through the passwd database.

use pshandle_core::{PshandleError, PshandleResult};
use std::ffi::CStr;

/// Scratch space offered to `getpwuid_r` on the first attempt.
const PASSWD_BUF_INITIAL: usize = 1024;

/// Largest scratch space tried before giving up on `ERANGE`.
const PASSWD_BUF_MAX: usize = 64 * 1024;

/// Errors `getpwuid_r(3)` may use to say "no such entry" instead of a null result.
fn means_not_found(code: i32) -> bool {
    matches!(code, libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM)
}

/// Account name for `uid`.
///
/// `Ok(None)` when the passwd database has no entry for it. Any other lookup
/// failure, including a record larger than the scratch bound, is `System`.
pub fn lookup_username(uid: u32) -> PshandleResult<Option<String>> {
    let mut scratch: Vec<libc::c_char> = Vec::new();
    let mut capacity = PASSWD_BUF_INITIAL;

    loop {
        scratch.clear();
        scratch.try_reserve_exact(capacity).map_err(|_| {
            PshandleError::out_of_memory(format!("passwd buffer of {} bytes", capacity))
        })?;
        scratch.resize(capacity, 0);

        let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
        let mut found: *mut libc::passwd = std::ptr::null_mut();
        let code = unsafe {
            libc::getpwuid_r(
                uid,
                &mut entry,
                scratch.as_mut_ptr(),
                scratch.len(),
                &mut found,
            )
        };

        match code {
            0 if found.is_null() || entry.pw_name.is_null() => return Ok(None),
            0 => {
                let name = unsafe { CStr::from_ptr(entry.pw_name) };
                return Ok(Some(name.to_string_lossy().into_owned()));
            }
            libc::ERANGE if capacity < PASSWD_BUF_MAX => capacity *= 2,
            code if means_not_found(code) => return Ok(None),
            code => {
                return Err(PshandleError::system(
                    format!("getpwuid_r for uid {}", uid),
                    code,
                ))
            }
        }
    }
}
