//! Time sources and timestamp parsing.
//!
//! All times are milliseconds since the Unix epoch. Tables read the current
//! time through a [`Clock`] so trailing windows can be driven by a
//! [`ManualClock`] in tests.

use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Clock handle shared between a table and everything derived from it.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl SystemClock {
    /// Returns a shared handle to the system clock.
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock stopped at `millis`.
    pub fn new(millis: i64) -> Self {
        Self {
            now: AtomicI64::new(millis),
        }
    }

    /// Sets the current time.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Parses an ISO-8601 / RFC 3339 timestamp into epoch milliseconds.
///
/// Strings without an offset are read as UTC. Producers that write local
/// time without an offset (Python's `datetime.now().isoformat()`, say) land
/// hours off on hosts away from UTC; use [`parse_timestamp_in`] with the
/// producer's offset for those. A trailing `Z` is accepted, as are a space
/// instead of `T` and a bare date.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    parse_timestamp_in(text, Utc.fix())
}

/// Like [`parse_timestamp`], reading strings without an offset as local
/// time at `offset`. Strings that carry their own offset ignore it.
pub fn parse_timestamp_in(text: &str, offset: FixedOffset) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    let local = |naive: NaiveDateTime| {
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp_millis())
    };
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local(naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local)
}

/// Converts a field value into epoch milliseconds.
///
/// `DateTime` is taken as-is, strings are parsed as ISO-8601 and numbers
/// are epoch seconds.
pub fn value_to_millis(value: &Value) -> Option<i64> {
    match value {
        Value::DateTime(ms) => Some(*ms),
        Value::String(s) => parse_timestamp(s),
        Value::Int64(secs) => secs.checked_mul(1000),
        Value::Float64(secs) if secs.is_finite() => Some((secs * 1000.0).round() as i64),
        _ => None,
    }
}

/// Formats epoch milliseconds as an RFC 3339 UTC string.
pub fn format_millis(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}

/// Milliseconds in `minutes` minutes.
#[inline]
pub fn minutes(minutes: u64) -> i64 {
    (minutes as i64).saturating_mul(60_000)
}
