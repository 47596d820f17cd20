//! Retained-password history and its hex field encoding.
//!
//! The wire form is `{enabled:1}{maxSize:2}{count:2}` followed by one
//! `{time:8}{passwdLen:4}{passwd}` block per entry.  The count is
//! advisory on decode; entries are parsed to the end of the string, and
//! encode always writes the real count.

use chrono::{DateTime, Utc};

use crate::errors::{PsafeError, Result};

pub const MAX_SIZE_MAX: usize = 255;

/// Fixed-width header: enabled flag, max size, entry count.
const HEADER_LEN: usize = 5;
/// Fixed-width entry prefix: timestamp plus password length.
const ENTRY_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub passwd: String,
}

/// Password history for one record: an enabled flag, a capacity, and
/// entries kept newest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    enabled: bool,
    max_size: usize,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new(enabled: bool, max_size: usize) -> Self {
        Self {
            enabled,
            max_size: max_size.min(MAX_SIZE_MAX),
            entries: Vec::new(),
        }
    }

    /// Decode a history field string.
    pub fn parse(history_str: &str) -> Result<Self> {
        let chars: Vec<char> = history_str.chars().collect();
        let history_len = chars.len();
        if history_len < HEADER_LEN {
            return Err(too_short(history_len, HEADER_LEN));
        }

        let enabled = chars[0] != '0';
        let max_size = hex_field(&chars, 1, 2, "max size")? as usize;

        // The count at offset 3 must be hex but its value is advisory;
        // entries are read to the end of the string regardless.
        hex_field(&chars, 3, 2, "entry count")?;

        let mut entries = Vec::new();
        let mut pos = HEADER_LEN;
        while pos < history_len {
            if pos + ENTRY_PREFIX_LEN > history_len {
                return Err(too_short(history_len, pos + ENTRY_PREFIX_LEN));
            }
            let secs = hex_field(&chars, pos, 8, "entry time")?;
            let passwd_len = hex_field(&chars, pos + 8, 4, "password length")? as usize;
            if pos + ENTRY_PREFIX_LEN + passwd_len > history_len {
                return Err(too_short(history_len, pos + ENTRY_PREFIX_LEN + passwd_len));
            }
            let passwd: String = chars[pos + ENTRY_PREFIX_LEN..pos + ENTRY_PREFIX_LEN + passwd_len]
                .iter()
                .collect();
            let date = DateTime::from_timestamp(secs as i64, 0).ok_or_else(|| {
                PsafeError::format("password history", format!("entry time out of range: {secs:x}"))
            })?;
            entries.push(HistoryEntry { date, passwd });
            pos += ENTRY_PREFIX_LEN + passwd_len;
        }

        let mut history = Self {
            enabled,
            max_size: max_size.min(MAX_SIZE_MAX),
            entries,
        };
        history.sort();
        Ok(history)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the capacity, dropping the oldest entries past it.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.min(MAX_SIZE_MAX);
        while self.entries.len() > self.max_size {
            self.entries.pop();
        }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Drop all retained entries, keeping the flag and capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record a superseded password.  Does nothing unless the history is
    /// enabled with a positive capacity; evicts the oldest entries to
    /// keep room for the new one.
    pub fn add_passwd(&mut self, passwd: impl Into<String>, date: DateTime<Utc>) {
        if !self.enabled || self.max_size == 0 {
            return;
        }
        while self.entries.len() >= self.max_size {
            self.entries.pop();
        }
        self.entries.push(HistoryEntry {
            date,
            passwd: passwd.into(),
        });
        self.sort();
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

/// Encodes the field wire form.
impl std::fmt::Display for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(self.enabled))?;
        write!(f, "{:02x}", self.max_size)?;
        write!(f, "{:02x}", self.entries.len())?;
        for entry in &self.entries {
            // Fixed 8-digit width; timestamps outside 1970..2106 clamp.
            let secs = entry.date.timestamp().clamp(0, i64::from(u32::MAX)) as u32;
            write!(f, "{secs:08x}")?;
            write!(f, "{:04x}", entry.passwd.chars().count())?;
            write!(f, "{}", entry.passwd)?;
        }
        Ok(())
    }
}

fn too_short(have: usize, need: usize) -> PsafeError {
    PsafeError::format(
        "password history",
        format!("field length ({have}) too short: {need}"),
    )
}

fn hex_field(chars: &[char], start: usize, len: usize, what: &'static str) -> Result<u64> {
    let mut value = 0u64;
    for &c in &chars[start..start + len] {
        let digit = c.to_digit(16).ok_or_else(|| {
            PsafeError::format("password history", format!("invalid hex in {what}"))
        })?;
        value = (value << 4) | u64::from(digit);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn parses_entries_newest_first() {
        let h = History::parse("10303000000200003abc000003000002xy000000100000").unwrap();
        assert!(h.is_enabled());
        assert_eq!(h.max_size(), 3);
        let dates: Vec<i64> = h.entries().iter().map(|e| e.date.timestamp()).collect();
        assert_eq!(dates, vec![0x300, 0x20, 0x10]);
        assert_eq!(h.entries()[0].passwd, "xy");
        assert_eq!(h.entries()[1].passwd, "abc");
        assert_eq!(h.entries()[2].passwd, "");
    }

    #[test]
    fn trailing_empty_password_round_trips() {
        let s = "1020100000002a0000";
        let h = History::parse(s).unwrap();
        assert_eq!(h.entries().len(), 1);
        assert_eq!(h.entries()[0].passwd, "");
        assert_eq!(h.to_string(), s);
    }

    #[test]
    fn truncated_entry_is_rejected() {
        assert!(History::parse("102010000002a").is_err());
        assert!(History::parse("1020100000002a0005ab").is_err());
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(History::parse("102").is_err());
    }

    #[test]
    fn add_passwd_honors_capacity() {
        let mut h = History::new(true, 2);
        h.add_passwd("one", ts(100));
        h.add_passwd("two", ts(200));
        h.add_passwd("three", ts(300));
        let passwds: Vec<&str> = h.entries().iter().map(|e| e.passwd.as_str()).collect();
        assert_eq!(passwds, vec!["three", "two"]);
    }

    #[test]
    fn add_passwd_noop_when_disabled_or_zero() {
        let mut h = History::new(false, 5);
        h.add_passwd("one", ts(100));
        assert!(h.entries().is_empty());

        let mut h = History::new(true, 0);
        h.add_passwd("one", ts(100));
        assert!(h.entries().is_empty());
    }

    #[test]
    fn shrinking_max_size_drops_oldest() {
        let mut h = History::new(true, 5);
        h.add_passwd("one", ts(100));
        h.add_passwd("two", ts(200));
        h.add_passwd("three", ts(300));
        h.set_max_size(1);
        assert_eq!(h.entries().len(), 1);
        assert_eq!(h.entries()[0].passwd, "three");
    }

    #[test]
    fn non_hex_count_is_rejected() {
        assert!(History::parse("103zz000000640004test").is_err());
        assert!(History::parse("103g0").is_err());
    }

    #[test]
    fn count_is_advisory_on_decode() {
        // Declared zero entries, one actually present.
        let h = History::parse("10300000000640004test").unwrap();
        assert_eq!(h.entries().len(), 1);
        assert_eq!(h.entries()[0].passwd, "test");
        assert_eq!(h.entries()[0].date.timestamp(), 100);
    }
}
