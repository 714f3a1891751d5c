//! Workout-global rest countdown and clock formatting.
//!
//! The countdown never stops at zero; it keeps running into negative
//! "overrun" time until cancelled or restarted.

use chrono::{Duration, NaiveDateTime};

/// What the rest display should show
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestStatus {
    /// No countdown running
    Idle,
    /// Seconds left, zero included
    Resting(i64),
    /// Seconds past the end of the rest period, always negative
    Overrun(i64),
}

impl RestStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, RestStatus::Idle)
    }

    /// `MM:SS` while resting, `-MM:SS` in overrun, empty when idle
    pub fn display(&self) -> String {
        match *self {
            RestStatus::Idle => String::new(),
            RestStatus::Resting(secs) | RestStatus::Overrun(secs) => format_clock(secs),
        }
    }
}

/// A single rest countdown. Starting it again replaces the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestTimer {
    duration: Duration,
    started_at: Option<NaiveDateTime>,
}

impl RestTimer {
    pub fn new(duration_seconds: i64) -> Self {
        Self {
            duration: Duration::seconds(duration_seconds),
            started_at: None,
        }
    }

    /// (Re)start the countdown at `now`
    pub fn start(&mut self, now: NaiveDateTime) {
        if self.started_at.is_some() {
            tracing::debug!("Restarting rest timer, previous countdown replaced");
        }
        self.started_at = Some(now);
    }

    /// Stop the countdown. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        self.started_at.take().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Signed seconds remaining; negative once overrun
    pub fn remaining(&self, now: NaiveDateTime) -> Option<i64> {
        self.started_at
            .map(|start| (self.duration - (now - start)).num_seconds())
    }

    pub fn status(&self, now: NaiveDateTime) -> RestStatus {
        match self.remaining(now) {
            None => RestStatus::Idle,
            Some(secs) if secs >= 0 => RestStatus::Resting(secs),
            Some(secs) => RestStatus::Overrun(secs),
        }
    }
}

/// Format signed seconds as `MM:SS`, prefixing `-` when negative.
/// Minutes are not wrapped into hours.
pub fn format_clock(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

/// Workout elapsed time as `MM:SS`; clamps clock skew to zero
pub fn format_elapsed(elapsed: Duration) -> String {
    format_clock(elapsed.num_seconds().max(0))
}
