//! CSV rollup functionality for archiving the workout log.
//!
//! Each logged set becomes one CSV row tagged with its workout id, so the
//! archive stays usable for PR lookups after the log is rotated.

use crate::{CompletedWorkout, Result, SetRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// Timestamp format used in the CSV archive
const CSV_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One set row in the CSV archive
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvSetRow {
    pub workout_id: String,
    pub workout_start: String,
    pub workout_end: String,
    pub exercise_id: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub start_time: String,
    pub end_time: String,
}

impl CsvSetRow {
    fn new(workout: &CompletedWorkout, set: &SetRecord) -> Self {
        CsvSetRow {
            workout_id: workout.id.to_string(),
            workout_start: format_time(workout.start_time),
            workout_end: format_time(workout.end_time),
            exercise_id: set.exercise_id.clone(),
            set_number: set.set_number,
            weight: set.weight,
            reps: set.reps,
            start_time: format_time(set.start_time),
            end_time: format_time(set.end_time),
        }
    }
}

fn format_time(t: NaiveDateTime) -> String {
    t.format(CSV_TIME_FORMAT).to_string()
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, CSV_TIME_FORMAT).ok()
}

/// Roll up logged workouts into CSV and archive the log atomically
///
/// This function:
/// 1. Reads all workouts from the log
/// 2. Appends one row per set to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the log to `.processed`
/// 5. Returns the number of workouts processed
///
/// The CSV is fsynced before the log is renamed, and the log is renamed
/// rather than deleted so it can be recovered by hand.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let workouts = crate::wal::read_workouts(log_path)?;

    if workouts.is_empty() {
        tracing::info!("No workouts in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Headers only on a fresh file
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    let mut rows = 0;
    for workout in &workouts {
        for set in &workout.sets {
            writer.serialize(CsvSetRow::new(workout, set))?;
            rows += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} set rows from {} workouts to CSV", rows, workouts.len());

    let processed_path = log_path.with_extension("jsonl.processed");
    std::fs::rename(log_path, &processed_path)?;

    tracing::info!("Archived workout log to {:?}", processed_path);

    Ok(workouts.len())
}

/// Remove archived `.processed` logs from a directory
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed logs", count);
    }

    Ok(count)
}
