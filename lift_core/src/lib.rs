#![forbid(unsafe_code)]

//! Core domain model and business logic for Liftlog, a strength-training
//! session tracker.
//!
//! This crate provides:
//! - Domain types (exercises, sets, sessions, personal records)
//! - The workout session engine (set progression, rest timer, suggestions)
//! - Crash-safe session snapshots
//! - Workout submission (local log, CSV archive, HTTP service)
//! - PR lookup over stored history

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod measure;
pub mod routine;
pub mod store;
pub mod rest;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod remote;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use measure::Measurement;
pub use routine::Routine;
pub use store::SessionStore;
pub use rest::{RestStatus, RestTimer};
pub use wal::{JsonlWorkoutLog, WorkoutSink};
pub use history::{PrSource, WorkoutHistory};
pub use remote::HttpBackend;
pub use engine::{LookupTicket, WorkoutEngine};
