//! Password expiration: an absolute time plus an optional recurrence
//! interval.  The two live in separate record fields; the interval is
//! only meaningful when recurrence is on.

use chrono::{DateTime, Utc};

pub const VALID_INTERVAL_MIN: u32 = 1;
pub const VALID_INTERVAL_MAX: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswdExpiration {
    pub expiration: DateTime<Utc>,
    pub interval: u32,
    pub recurring: bool,
}

impl PasswdExpiration {
    /// Build an expiration, clamping the interval to the valid range and
    /// turning recurrence off when no usable interval remains.
    pub fn new(expiration: DateTime<Utc>, interval: u32, recurring: bool) -> Self {
        let interval = interval.min(VALID_INTERVAL_MAX);
        Self {
            expiration,
            interval,
            recurring: recurring && interval >= VALID_INTERVAL_MIN,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }
}
