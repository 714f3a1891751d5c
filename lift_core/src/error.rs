//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad arguments to a session operation (e.g. empty routine)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Weight or reps missing or outside the accepted range
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    /// Attempt to log past the per-exercise set cap
    #[error("Exercise {exercise_index} already has {cap} sets logged")]
    CapacityExceeded { exercise_index: usize, cap: usize },

    /// A workout is already in progress
    #[error("A workout session is already in progress")]
    SessionInProgress,

    /// No workout is in progress
    #[error("No workout session in progress")]
    NoActiveSession,

    /// Session snapshot could not be written or read
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Finished workout was rejected or the backend was unreachable
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Personal record query failed
    #[error("PR lookup failed: {0}")]
    Lookup(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
