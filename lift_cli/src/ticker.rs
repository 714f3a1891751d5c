//! Workout clock and rest countdown redraw for interactive terminals.
//!
//! The ticker only ever sees copies of the rest timer and the session start,
//! never the session itself.

use chrono::NaiveDateTime;
use lift_core::rest::format_elapsed;
use lift_core::{Clock, RestTimer, SystemClock};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// Background thread redrawing the clock line once per second
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(timer: RestTimer, workout_start: NaiveDateTime) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                let now = SystemClock.now();
                // Save cursor, draw on the line above the prompt, restore
                print!(
                    "\x1b7\x1b[1A\r\x1b[2K{}\x1b8",
                    clock_line(timer, workout_start, now)
                );
                let _ = io::stdout().flush();
                thread::park_timeout(TICK);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::warn!("Clock ticker thread panicked");
            }
        }
    }
}

/// `Workout MM:SS`, followed by the rest countdown while one runs
pub fn clock_line(timer: RestTimer, workout_start: NaiveDateTime, now: NaiveDateTime) -> String {
    let mut line = format!("Workout {}", format_elapsed(now - workout_start));
    let rest = timer.status(now);
    if rest.is_active() {
        line.push_str(&format!("  Rest {}", rest.display()));
    }
    line
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
