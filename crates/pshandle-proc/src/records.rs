//! Parsers for the simpler per-process records: argument blobs
//! (`cmdline`, `environ`), the labeled `status` record, and `statm`.

use crate::{IdTriple, MemoryInfo};
use pshandle_core::{PshandleError, PshandleResult};

/// Split a command line blob into arguments.
///
/// Arguments are separated by null bytes and the last byte is a null
/// terminator. Processes that rewrite their title (setproctitle and friends)
/// often separate with spaces and drop the terminator; when the last byte is
/// not a null, spaces are the separator instead.
pub fn split_cmdline(blob: &[u8]) -> Vec<String> {
    let sep = match blob.last() {
        Some(0) | None => 0,
        Some(_) => b' ',
    };
    split_fields(blob, sep)
}

/// Split a null-delimited environment blob into `KEY=VALUE` entries.
pub fn split_environ(blob: &[u8]) -> Vec<String> {
    split_fields(blob, 0)
}

/// Split on `sep`, dropping one trailing separator. Order is preserved.
fn split_fields(blob: &[u8], sep: u8) -> Vec<String> {
    let body = blob.strip_suffix(&[sep]).unwrap_or(blob);
    if body.is_empty() {
        return Vec::new();
    }
    body.split(|&b| b == sep)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Parse the real, effective and saved ids from a labeled status line.
///
/// `label` is the line prefix including the colon, e.g. `"Uid:"`. The label
/// must start a line; `"Uid:"` inside another line's value does not match.
///
/// Format: `Uid:\treal\teffective\tsaved\tfilesystem`
pub fn parse_id_triple(status: &str, label: &str) -> PshandleResult<IdTriple> {
    let rest = status
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .ok_or_else(|| PshandleError::parse_failure(format!("status record: no {} line", label)))?;

    let ids: Vec<u32> = rest
        .split_whitespace()
        .take(3)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| PshandleError::parse_failure(format!("status record: bad {} line", label)))?;

    match ids[..] {
        [real, effective, saved] => Ok(IdTriple {
            real,
            effective,
            saved,
        }),
        _ => Err(PshandleError::parse_failure(format!(
            "status record: {} needs 3 ids, found {}",
            label,
            ids.len()
        ))),
    }
}

/// Parse `/proc/[pid]/statm`.
///
/// Format: `size resident shared text lib data dt` (all in pages).
pub fn parse_statm(content: &str) -> PshandleResult<MemoryInfo> {
    let values: Vec<u64> = content
        .split_whitespace()
        .take(7)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| PshandleError::parse_failure("statm record: non-numeric field"))?;

    match values[..] {
        [size, resident, shared, text, lib, data, dirty] => Ok(MemoryInfo {
            rss: resident,
            vms: size,
            shared,
            text,
            lib,
            data,
            dirty,
        }),
        _ => Err(PshandleError::parse_failure(format!(
            "statm record: parsed {}/7 fields",
            values.len()
        ))),
    }
}
