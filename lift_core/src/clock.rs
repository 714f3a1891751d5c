//! Time source for set stamping and timers.
//!
//! All timestamps are local wall-clock time without an offset, truncated
//! to whole seconds. The same clock stamps sets and the session start so
//! elapsed-time displays stay consistent across reloads.

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use std::cell::Cell;

/// Supplies the current local time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the user's local time zone
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(Local::now().naive_local())
    }
}

/// Settable clock for replays and tests
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(truncate_to_seconds(start)),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.now.set(truncate_to_seconds(at));
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&self, seconds: i64) {
        self.now.set(self.now.get() + Duration::seconds(seconds));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Drop sub-second precision
pub fn truncate_to_seconds(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}
