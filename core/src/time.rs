//! Time related utils.
//!
//! Every component reads the current time through [`Clock`] (via
//! `Context::now`) so expiry arithmetic can be tested at exact boundaries.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use crate::{Error, Result};

/// DateTime used across federate, always in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Create date time with current system time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format time into RFC3339: `2022-03-13T07:20:04Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse RFC3339 string like `2022-03-13T07:20:04.123Z` into UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected(format!("parse '{s}' into rfc3339 failed")).with_source(e)
        })
}

/// Clock is the source of the current time.
pub trait Clock: Debug + Send + Sync + 'static {
    /// Return the current time.
    fn now(&self) -> DateTime;
}

/// SystemClock reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        now()
    }
}

/// ManualClock only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to a `Context`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `t`.
    pub fn set(&self, t: DateTime) {
        *self.now.lock().expect("lock poisoned") = t;
    }

    /// Move the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        let delta = chrono::TimeDelta::from_std(d).expect("duration in bounds");
        *self.now.lock().expect("lock poisoned") += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        *self.now.lock().expect("lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(test_time()), "20220301")
    }

    #[test]
    fn test_format_iso8601() {
        assert_eq!(format_iso8601(test_time()), "20220301T081234Z")
    }

    #[test]
    fn test_format_rfc3339() {
        assert_eq!(format_rfc3339(test_time()), "2022-03-01T08:12:34Z")
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = Utc
            .with_ymd_and_hms(2022, 3, 1, 8, 12, 34)
            .unwrap()
            .checked_add_signed(chrono::TimeDelta::try_milliseconds(123).unwrap())
            .unwrap();
        for v in [
            "2022-03-01T08:12:34.123Z",
            "2022-03-01T16:12:34.123+08:00",
            "2022-03-01T00:12:34.123-08:00",
        ] {
            assert_eq!(t, parse_rfc3339(v).expect("must be valid time"));
        }

        assert!(parse_rfc3339("next tuesday").is_err());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(test_time());
        let shared = clock.clone();

        clock.advance(Duration::from_secs(3650));
        assert_eq!(
            shared.now(),
            Utc.with_ymd_and_hms(2022, 3, 1, 9, 13, 24).unwrap()
        );
    }
}
