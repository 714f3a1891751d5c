//! Local workout log.
//!
//! Finished workouts are appended to a JSONL (JSON Lines) file with file
//! locking to ensure safe concurrent access.

use crate::{CompletedWorkout, Error, Receipt, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for finished workouts
pub trait WorkoutSink {
    /// Store a workout. All-or-nothing: an error means nothing was kept.
    fn submit(&mut self, workout: &CompletedWorkout) -> Result<Receipt>;
}

/// JSONL-based workout log with file locking
pub struct JsonlWorkoutLog {
    path: PathBuf,
}

impl JsonlWorkoutLog {
    /// Create a new JSONL log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, workout: &CompletedWorkout) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut line = serde_json::to_string(workout)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);
        file.sync_all()?;

        file.unlock()?;
        Ok(())
    }
}

impl WorkoutSink for JsonlWorkoutLog {
    fn submit(&mut self, workout: &CompletedWorkout) -> Result<Receipt> {
        self.append(workout)
            .map_err(|e| Error::Submission(format!("failed to write {:?}: {}", self.path, e)))?;

        tracing::debug!(
            "Appended workout {} ({} sets) to log",
            workout.id,
            workout.sets.len()
        );
        Ok(Receipt::for_workout(workout))
    }
}

/// Read all workouts from a log file, skipping unparseable lines
pub fn read_workouts(path: &Path) -> Result<Vec<CompletedWorkout>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut workouts = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CompletedWorkout>(&line) {
            Ok(workout) => workouts.push(workout),
            Err(e) => {
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from log", workouts.len());
    Ok(workouts)
}
