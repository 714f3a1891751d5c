//! Core domain types for the workout session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise references and logged sets
//! - The active session and its per-exercise progress
//! - Submission payloads and receipts
//! - Personal records and input suggestions

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of sets per exercise within a session
pub const SET_CAP: usize = 3;

// ============================================================================
// Exercise Types
// ============================================================================

/// Reference to a library exercise. The id is opaque and externally assigned.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
}

/// One completed block of reps at a given weight
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub exercise_id: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl SetRecord {
    pub fn time_under_tension(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Where an exercise stands within the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetState {
    /// Awaiting the n-th set (1-based)
    Pending(u32),
    Done,
}

/// An exercise and the sets logged for it, in completion order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionExercise {
    pub exercise: ExerciseRef,
    #[serde(default)]
    pub sets: Vec<SetRecord>,
}

impl SessionExercise {
    pub fn new(exercise: ExerciseRef) -> Self {
        Self {
            exercise,
            sets: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sets.len() >= SET_CAP
    }

    pub fn state(&self) -> SetState {
        if self.is_complete() {
            SetState::Done
        } else {
            SetState::Pending(self.sets.len() as u32 + 1)
        }
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// The in-progress workout. This is exactly what gets persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub start_time: NaiveDateTime,
    pub exercises: Vec<SessionExercise>,
}

impl Session {
    /// Lowest-indexed exercise that still has sets to log.
    ///
    /// Derived from set counts on every call; never stored.
    pub fn active_exercise(&self) -> Option<usize> {
        self.exercises.iter().position(|e| !e.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.active_exercise().is_none()
    }

    pub fn exercise_state(&self, index: usize) -> Option<SetState> {
        self.exercises.get(index).map(SessionExercise::state)
    }

    /// All logged sets in exercise order, then set order
    pub fn flatten_sets(&self) -> Vec<SetRecord> {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter().cloned())
            .collect()
    }

    pub fn logged_set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn elapsed(&self, now: NaiveDateTime) -> Duration {
        now - self.start_time
    }
}

// ============================================================================
// Submission Types
// ============================================================================

/// Payload handed to the workout storage collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedWorkout {
    pub id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub sets: Vec<SetRecord>,
}

impl CompletedWorkout {
    pub fn from_session(session: &Session, end_time: NaiveDateTime) -> Self {
        Self {
            id: session.id,
            start_time: session.start_time,
            end_time,
            sets: session.flatten_sets(),
        }
    }
}

/// Acknowledgment of a stored workout
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub workout_id: Uuid,
    pub submitted_sets: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl Receipt {
    pub fn for_workout(workout: &CompletedWorkout) -> Self {
        Self {
            workout_id: workout.id,
            submitted_sets: workout.sets.len(),
            start_time: workout.start_time,
            end_time: workout.end_time,
        }
    }
}

// ============================================================================
// PR Types
// ============================================================================

/// Historical best for one exercise at one set position
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub max_weight: f64,
    pub max_reps: u32,
}

/// Where a suggested input default came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionSource {
    PersonalRecord,
    NoData,
}

/// Pre-filled input for the upcoming set. Advisory only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Suggestion {
    pub exercise_index: usize,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub source: SuggestionSource,
}
