//! Routine files: the ordered exercise list a session is started from.
//!
//! ```toml
//! [[exercises]]
//! id = "12"
//! name = "Bench Press"
//! muscle_group = "Chest"
//! ```

use crate::{Error, ExerciseRef, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Routine {
    #[serde(default)]
    pub exercises: Vec<ExerciseRef>,
}

impl Routine {
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let routine: Routine = toml::from_str(&contents)?;
        tracing::info!(
            "Loaded routine with {} exercises from {:?}",
            routine.exercises.len(),
            path
        );
        Ok(routine)
    }

    /// Validate exercise entries.
    ///
    /// Returns a list of problems (empty if OK). Repeated exercises are
    /// allowed; an empty routine is rejected when the session is created.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (i, exercise) in self.exercises.iter().enumerate() {
            if exercise.id.trim().is_empty() {
                errors.push(format!("Exercise #{} has empty id", i + 1));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise #{} ('{}') has empty name", i + 1, exercise.id));
            }
        }

        errors
    }

    /// Validate and hand over the exercise list
    pub fn into_exercises(self) -> Result<Vec<ExerciseRef>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::InvalidInput(errors.join("; ")));
        }
        Ok(self.exercises)
    }
}
