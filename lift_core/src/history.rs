//! Personal-record lookup over stored workouts.
//!
//! PRs are tracked per set position: the best weight and best reps ever
//! logged as set N of an exercise, independently maximised. History is read
//! from both the live workout log and the CSV archive.

use crate::csv_rollup::{parse_time, CsvSetRow};
use crate::{PersonalRecord, Result, SetRecord};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Answers "best so far for this exercise at this set position"
pub trait PrSource {
    /// `Ok(None)` means no history for that set position
    fn personal_record(
        &self,
        user_id: &str,
        exercise_id: &str,
        set_number: u32,
    ) -> Result<Option<PersonalRecord>>;
}

/// PR source backed by the local workout log and CSV archive
pub struct WorkoutHistory {
    log_path: PathBuf,
    csv_path: PathBuf,
}

impl WorkoutHistory {
    pub fn new(log_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            csv_path: csv_path.into(),
        }
    }

    /// Every stored set, deduplicated by workout id across log and archive
    pub fn load_sets(&self) -> Result<Vec<SetRecord>> {
        let mut sets = Vec::new();
        let mut seen_ids = HashSet::new();

        for workout in crate::wal::read_workouts(&self.log_path)? {
            if seen_ids.insert(workout.id) {
                sets.extend(workout.sets);
            }
        }
        let log_count = sets.len();

        if self.csv_path.exists() {
            for (workout_id, set) in load_sets_from_csv(&self.csv_path)? {
                if !seen_ids.contains(&workout_id) {
                    sets.push(set);
                }
            }
        }

        tracing::debug!(
            "Loaded {} sets from log and {} from archive",
            log_count,
            sets.len() - log_count
        );
        Ok(sets)
    }
}

impl PrSource for WorkoutHistory {
    fn personal_record(
        &self,
        _user_id: &str,
        exercise_id: &str,
        set_number: u32,
    ) -> Result<Option<PersonalRecord>> {
        let sets = self.load_sets()?;
        Ok(best_for_position(&sets, exercise_id, set_number))
    }
}

/// Max weight and max reps over matching sets, each taken on its own
pub fn best_for_position(
    sets: &[SetRecord],
    exercise_id: &str,
    set_number: u32,
) -> Option<PersonalRecord> {
    sets.iter()
        .filter(|s| s.exercise_id == exercise_id && s.set_number == set_number)
        .fold(None, |best: Option<PersonalRecord>, s| {
            Some(match best {
                None => PersonalRecord {
                    max_weight: s.weight,
                    max_reps: s.reps,
                },
                Some(pr) => PersonalRecord {
                    max_weight: pr.max_weight.max(s.weight),
                    max_reps: pr.max_reps.max(s.reps),
                },
            })
        })
}

/// Load archived set rows, skipping malformed ones
fn load_sets_from_csv(path: &Path) -> Result<Vec<(Uuid, SetRecord)>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut sets = Vec::new();
    for result in reader.deserialize::<CsvSetRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
                continue;
            }
        };

        let parsed = Uuid::parse_str(&row.workout_id).ok().zip(
            parse_time(&row.start_time).zip(parse_time(&row.end_time)),
        );
        match parsed {
            Some((workout_id, (start_time, end_time))) => sets.push((
                workout_id,
                SetRecord {
                    exercise_id: row.exercise_id,
                    set_number: row.set_number,
                    weight: row.weight,
                    reps: row.reps,
                    start_time,
                    end_time,
                },
            )),
            None => tracing::warn!("Skipping CSV row with bad id or timestamp"),
        }
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{JsonlWorkoutLog, WorkoutSink};
    use crate::CompletedWorkout;
    use chrono::NaiveDate;

    fn workout(sets: &[(&str, u32, f64, u32)]) -> CompletedWorkout {
        let t = NaiveDate::from_ymd_opt(2024, 1, 20)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        CompletedWorkout {
            id: Uuid::new_v4(),
            start_time: t,
            end_time: t + chrono::Duration::hours(1),
            sets: sets
                .iter()
                .map(|(ex, n, w, r)| SetRecord {
                    exercise_id: (*ex).into(),
                    set_number: *n,
                    weight: *w,
                    reps: *r,
                    start_time: t,
                    end_time: t + chrono::Duration::seconds(30),
                })
                .collect(),
        }
    }

    fn paths(dir: &Path) -> (PathBuf, PathBuf) {
        (dir.join("workouts.jsonl"), dir.join("sets.csv"))
    }

    #[test]
    fn test_pr_is_per_set_position() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (log_path, csv_path) = paths(temp_dir.path());

        let mut log = JsonlWorkoutLog::new(&log_path);
        log.submit(&workout(&[("1", 1, 60.0, 8), ("1", 2, 55.0, 10)]))
            .unwrap();
        log.submit(&workout(&[("1", 1, 62.5, 5), ("2", 1, 100.0, 5)]))
            .unwrap();

        let history = WorkoutHistory::new(&log_path, &csv_path);
        assert_eq!(
            history.personal_record("u", "1", 1).unwrap(),
            Some(PersonalRecord {
                max_weight: 62.5,
                max_reps: 8
            })
        );
        assert_eq!(
            history.personal_record("u", "1", 2).unwrap(),
            Some(PersonalRecord {
                max_weight: 55.0,
                max_reps: 10
            })
        );
        assert_eq!(history.personal_record("u", "1", 3).unwrap(), None);
    }

    #[test]
    fn test_no_history_means_no_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (log_path, csv_path) = paths(temp_dir.path());

        let history = WorkoutHistory::new(&log_path, &csv_path);
        assert_eq!(history.personal_record("u", "1", 1).unwrap(), None);
    }

    #[test]
    fn test_archive_is_included_and_deduplicated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (log_path, csv_path) = paths(temp_dir.path());

        let archived = workout(&[("1", 1, 80.0, 3), ("1", 2, 75.0, 4)]);
        JsonlWorkoutLog::new(&log_path).submit(&archived).unwrap();
        crate::csv_rollup::log_to_csv_and_archive(&log_path, &csv_path).unwrap();

        // Same workout present again in a fresh log
        JsonlWorkoutLog::new(&log_path).submit(&archived).unwrap();

        let history = WorkoutHistory::new(&log_path, &csv_path);
        let sets = history.load_sets().unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(
            history.personal_record("u", "1", 1).unwrap(),
            Some(PersonalRecord {
                max_weight: 80.0,
                max_reps: 3
            })
        );
    }

    #[test]
    fn test_archive_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (log_path, csv_path) = paths(temp_dir.path());

        JsonlWorkoutLog::new(&log_path)
            .submit(&workout(&[("9", 1, 30.0, 12)]))
            .unwrap();
        crate::csv_rollup::log_to_csv_and_archive(&log_path, &csv_path).unwrap();

        let history = WorkoutHistory::new(&log_path, &csv_path);
        let pr = history.personal_record("u", "9", 1).unwrap().unwrap();
        assert_eq!(pr.max_weight, 30.0);
        assert_eq!(pr.max_reps, 12);
    }
}
