//! Parser for `/proc/[pid]/stat`.
//!
//! Format: `pid (comm) state ppid pgrp session tty_nr tpgid flags minflt
//! cminflt majflt cmajflt utime stime cutime cstime priority nice
//! num_threads itrealvalue starttime vsize rss ...`
//!
//! `comm` can contain spaces and parens, so it spans from the first `(` to
//! the last `)` in the record. The 20 fields after it are read by position.
//! Trailing fields beyond `starttime` are ignored.

use std::str::FromStr;

/// Number of positional fields required after the command name.
pub const STAT_FIELD_COUNT: usize = 20;

/// Zombie run-state code.
pub const ZOMBIE_STATE: char = 'Z';

/// One fresh reading of `/proc/[pid]/stat`.
///
/// Never cached: every query produces a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    /// Command name (lossy UTF-8 of the bytes between the parens).
    pub name: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    /// Controlling terminal device number; 0 means none.
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u32,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    /// Unused since Linux 2.6.17, always 0.
    pub itrealvalue: i64,
    /// Start time in clock ticks since boot.
    pub starttime: u64,
}

impl StatRecord {
    pub fn is_zombie(&self) -> bool {
        self.state == ZOMBIE_STATE
    }
}

/// Why a stat record could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatParseError {
    /// Nothing followed the command name. Treated as a failed read.
    Truncated,
    /// The record has the wrong shape.
    Malformed(String),
}

/// Positional field reader that counts successful conversions.
struct Fields<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
    parsed: usize,
}

impl<'a> Fields<'a> {
    fn next<T: FromStr>(&mut self) -> Option<T> {
        let value = self.tokens.next()?.parse().ok()?;
        self.parsed += 1;
        Some(value)
    }

    fn record(&mut self, name: String) -> Option<StatRecord> {
        Some(StatRecord {
            name,
            state: self.next()?,
            ppid: self.next()?,
            pgrp: self.next()?,
            session: self.next()?,
            tty_nr: self.next()?,
            tpgid: self.next()?,
            flags: self.next()?,
            minflt: self.next()?,
            cminflt: self.next()?,
            majflt: self.next()?,
            cmajflt: self.next()?,
            utime: self.next()?,
            stime: self.next()?,
            cutime: self.next()?,
            cstime: self.next()?,
            priority: self.next()?,
            nice: self.next()?,
            num_threads: self.next()?,
            itrealvalue: self.next()?,
            starttime: self.next()?,
        })
    }
}

/// Parse raw `/proc/[pid]/stat` bytes.
pub fn parse_stat(raw: &[u8]) -> Result<StatRecord, StatParseError> {
    let buf = raw.strip_suffix(b"\n").unwrap_or(raw);

    let open = buf
        .iter()
        .position(|&b| b == b'(')
        .ok_or_else(|| StatParseError::Malformed("stat record: no '('".into()))?;
    let close = buf
        .iter()
        .rposition(|&b| b == b')')
        .filter(|&close| close > open)
        .ok_or_else(|| StatParseError::Malformed("stat record: no ')'".into()))?;

    let name = String::from_utf8_lossy(&buf[open + 1..close]).into_owned();
    let rest = std::str::from_utf8(&buf[close + 1..])
        .map_err(|_| StatParseError::Malformed("stat record: non-ASCII field list".into()))?;

    if rest.split_ascii_whitespace().next().is_none() {
        return Err(StatParseError::Truncated);
    }

    let mut fields = Fields {
        tokens: rest.split_ascii_whitespace(),
        parsed: 0,
    };
    match fields.record(name) {
        Some(record) => Ok(record),
        None => Err(StatParseError::Malformed(format!(
            "stat record: parsed {}/{} fields",
            fields.parsed, STAT_FIELD_COUNT
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1234 (test process) S 1 1234 1234 34817 -1 4194304 1000 7 3 2 100 50 4 6 20 0 3 0 12345 67890 123 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0\n";

    #[test]
    fn test_parse_stat() {
        let stat = parse_stat(SAMPLE.as_bytes()).unwrap();
        assert_eq!(stat.name, "test process");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.pgrp, 1234);
        assert_eq!(stat.session, 1234);
        assert_eq!(stat.tty_nr, 34817);
        assert_eq!(stat.tpgid, -1);
        assert_eq!(stat.flags, 4194304);
        assert_eq!(stat.minflt, 1000);
        assert_eq!(stat.cminflt, 7);
        assert_eq!(stat.majflt, 3);
        assert_eq!(stat.cmajflt, 2);
        assert_eq!(stat.utime, 100);
        assert_eq!(stat.stime, 50);
        assert_eq!(stat.cutime, 4);
        assert_eq!(stat.cstime, 6);
        assert_eq!(stat.priority, 20);
        assert_eq!(stat.nice, 0);
        assert_eq!(stat.num_threads, 3);
        assert_eq!(stat.itrealvalue, 0);
        assert_eq!(stat.starttime, 12345);
        assert!(!stat.is_zombie());
    }

    #[test]
    fn test_name_with_parens_spans_first_to_last() {
        let content = "77 ((sh) (test)) R 5 6 7 0 -1 0 1 2 3 4 5 6 7 8 20 -5 1 0 999\n";
        let stat = parse_stat(content.as_bytes()).unwrap();
        assert_eq!(stat.name, "(sh) (test)");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.ppid, 5);
        assert_eq!(stat.utime, 5);
        assert_eq!(stat.nice, -5);
        assert_eq!(stat.starttime, 999);
    }

    #[test]
    fn test_name_with_spaces_and_close_paren_then_field() {
        let content = "9 (a) Z 1) Z 1 9 9 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 42";
        let stat = parse_stat(content.as_bytes()).unwrap();
        assert_eq!(stat.name, "a) Z 1");
        assert!(stat.is_zombie());
        assert_eq!(stat.starttime, 42);
    }

    #[test]
    fn test_non_utf8_name_is_lossy() {
        let mut raw = b"5 (ab".to_vec();
        raw.push(0xff);
        raw.extend_from_slice(b") S 1 1 1 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 7\n");
        let stat = parse_stat(&raw).unwrap();
        assert_eq!(stat.name, "ab\u{fffd}");
    }

    #[test]
    fn test_too_few_fields_is_malformed() {
        let content = "1 (init) S 0 1 1 0 -1\n";
        match parse_stat(content.as_bytes()) {
            Err(StatParseError::Malformed(msg)) => assert!(msg.contains("6/20"), "{msg}"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_field_stops_counting() {
        let content = "1 (init) S 0 1 1 0 -1 0 x 0 0 0 0 0 0 0 20 0 1 0 7\n";
        match parse_stat(content.as_bytes()) {
            Err(StatParseError::Malformed(msg)) => assert!(msg.contains("7/20"), "{msg}"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_nothing_after_name_is_truncated() {
        assert_eq!(parse_stat(b"1 (init)\n"), Err(StatParseError::Truncated));
        assert_eq!(parse_stat(b"1 (init)   "), Err(StatParseError::Truncated));
    }

    #[test]
    fn test_bad_state_is_malformed_not_truncated() {
        let content = "1 (init) SS 0 1 1 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 7\n";
        match parse_stat(content.as_bytes()) {
            Err(StatParseError::Malformed(msg)) => assert!(msg.contains("0/20"), "{msg}"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parens_is_malformed() {
        assert!(matches!(
            parse_stat(b"1 init S 0"),
            Err(StatParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_stat(b"1 )init( S 0"),
            Err(StatParseError::Malformed(_))
        ));
        assert!(matches!(parse_stat(b""), Err(StatParseError::Malformed(_))));
    }
}
