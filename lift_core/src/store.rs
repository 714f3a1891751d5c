//! Active session persistence with file locking.
//!
//! The store holds the single in-progress session in memory and mirrors
//! every mutation to one well-known snapshot file. A mutation is only
//! applied in memory once the snapshot write has succeeded, so memory and
//! disk never disagree after a failed write.

use crate::{Error, ExerciseRef, Result, Session, SessionExercise, SetRecord, SET_CAP};
use chrono::NaiveDateTime;
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// File name of the session snapshot slot
pub const SNAPSHOT_FILE: &str = "session.json";

/// Owner of the singleton active session
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Option<Session>,
}

impl SessionStore {
    /// Open the store at `path`, restoring any persisted session
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = read_snapshot(&path)?;
        if let Some(ref session) = current {
            tracing::info!(
                "Found in-progress session {} with {} sets logged",
                session.id,
                session.logged_set_count()
            );
        }
        Ok(Self { path, current })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session held in memory, if any
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Re-read the persisted snapshot from disk
    pub fn load(&self) -> Result<Option<Session>> {
        read_snapshot(&self.path)
    }

    /// Start a new session from a routine.
    ///
    /// Fails with `InvalidInput` on an empty routine and with
    /// `SessionInProgress` if a session already exists.
    pub fn create(&mut self, exercises: Vec<ExerciseRef>, now: NaiveDateTime) -> Result<&Session> {
        if exercises.is_empty() {
            return Err(Error::InvalidInput(
                "cannot start a workout with no exercises".into(),
            ));
        }
        if self.current.is_some() {
            return Err(Error::SessionInProgress);
        }

        let session = Session {
            id: Uuid::new_v4(),
            start_time: now,
            exercises: exercises.into_iter().map(SessionExercise::new).collect(),
        };
        write_snapshot(&self.path, &session)?;

        tracing::info!(
            "Created session {} with {} exercises",
            session.id,
            session.exercises.len()
        );
        Ok(&*self.current.insert(session))
    }

    /// Append a set to an exercise and persist in the same step
    pub fn append_set(&mut self, exercise_index: usize, record: SetRecord) -> Result<&Session> {
        let session = self.current.as_ref().ok_or(Error::NoActiveSession)?;
        let exercise = session.exercises.get(exercise_index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "exercise index {} out of range (session has {})",
                exercise_index,
                session.exercises.len()
            ))
        })?;

        if exercise.sets.len() >= SET_CAP {
            return Err(Error::CapacityExceeded {
                exercise_index,
                cap: SET_CAP,
            });
        }
        if record.exercise_id != exercise.exercise.id {
            return Err(Error::InvalidInput(format!(
                "set for exercise '{}' does not belong to '{}'",
                record.exercise_id, exercise.exercise.id
            )));
        }
        let expected = exercise.sets.len() as u32 + 1;
        if record.set_number != expected {
            return Err(Error::InvalidInput(format!(
                "expected set {}, got set {}",
                expected, record.set_number
            )));
        }
        if record.end_time < record.start_time {
            return Err(Error::InvalidInput("set ends before it starts".into()));
        }

        let mut updated = session.clone();
        updated.exercises[exercise_index].sets.push(record);
        write_snapshot(&self.path, &updated)?;

        Ok(&*self.current.insert(updated))
    }

    /// Drop the session and its snapshot. Idempotent.
    pub fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed session snapshot {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "failed to remove {:?}: {}",
                    self.path, e
                )))
            }
        }
        self.current = None;
        Ok(())
    }
}

/// Read the snapshot with a shared lock.
///
/// A missing file means no session. A file that cannot be read or parsed
/// is an error; it may hold an unfinished workout and must not be dropped.
fn read_snapshot(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        tracing::debug!("No session snapshot at {:?}", path);
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| persistence_error("open", path, e))?;
    file.lock_shared().map_err(|e| persistence_error("lock", path, e))?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let _ = file.unlock();
    read.map_err(|e| persistence_error("read", path, e))?;

    let session: Session =
        serde_json::from_str(&contents).map_err(|e| persistence_error("parse", path, e))?;
    tracing::debug!("Loaded session snapshot from {:?}", path);
    Ok(Some(session))
}

fn persistence_error(what: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Persistence(format!("failed to {} {:?}: {}", what, path, e))
}

/// Atomically replace the snapshot:
/// 1. Write to a temp file in the same directory
/// 2. Sync to disk
/// 3. Rename over the original
fn write_snapshot(path: &Path, session: &Session) -> Result<()> {
    write_snapshot_inner(path, session).map_err(|e| persistence_error("write", path, e))
}

fn write_snapshot_inner(path: &Path, session: &Session) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "snapshot path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(session)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved session snapshot to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(18, m, s)
            .unwrap()
    }

    fn routine() -> Vec<ExerciseRef> {
        vec![
            ExerciseRef {
                id: "1".into(),
                name: "Bench Press".into(),
                muscle_group: "Chest".into(),
            },
            ExerciseRef {
                id: "7".into(),
                name: "Barbell Row".into(),
                muscle_group: "Back".into(),
            },
        ]
    }

    fn set(exercise_id: &str, n: u32) -> SetRecord {
        SetRecord {
            exercise_id: exercise_id.into(),
            set_number: n,
            weight: 20.0,
            reps: 10,
            start_time: t(n, 0),
            end_time: t(n, 40),
        }
    }

    #[test]
    fn test_create_persists_and_reloads() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        assert!(store.current().is_none());
        let created = store.create(routine(), t(0, 0)).unwrap().clone();

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.current(), Some(&created));
        assert_eq!(created.start_time, t(0, 0));
        assert!(created.exercises.iter().all(|e| e.sets.is_empty()));
    }

    #[test]
    fn test_create_rejects_empty_routine() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        let result = store.create(vec![], t(0, 0));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_create_requires_no_active_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        let first = store.create(routine(), t(0, 0)).unwrap().id;
        assert!(matches!(
            store.create(routine(), t(1, 0)),
            Err(Error::SessionInProgress)
        ));
        assert_eq!(store.load().unwrap().unwrap().id, first);
    }

    #[test]
    fn test_append_set_persists_synchronously() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();
        store.append_set(0, set("1", 1)).unwrap();

        let on_disk = store.load().unwrap().unwrap();
        assert_eq!(on_disk.exercises[0].sets, vec![set("1", 1)]);
        assert_eq!(Some(&on_disk), store.current());
    }

    #[test]
    fn test_append_past_cap_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();
        for n in 1..=3 {
            store.append_set(0, set("1", n)).unwrap();
        }
        let before = std::fs::read(&path).unwrap();

        let result = store.append_set(0, set("1", 4));
        assert!(matches!(
            result,
            Err(Error::CapacityExceeded {
                exercise_index: 0,
                cap: 3
            })
        ));
        assert_eq!(store.current().unwrap().exercises[0].sets.len(), 3);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_append_rejects_wrong_set_number_or_exercise() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();

        assert!(matches!(
            store.append_set(0, set("1", 2)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.append_set(0, set("7", 1)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.append_set(5, set("1", 1)),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.current().unwrap().logged_set_count(), 0);
    }

    #[test]
    fn test_append_without_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(temp_dir.path().join(SNAPSHOT_FILE)).unwrap();
        assert!(matches!(
            store.append_set(0, set("1", 1)),
            Err(Error::NoActiveSession)
        ));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(!path.exists());
        assert!(store.current().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupted_snapshot_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);
        std::fs::write(&path, "{ invalid json }").unwrap();

        let result = SessionStore::open(&path);
        assert!(matches!(result, Err(Error::Persistence(_))));
        // Left in place for the user to inspect
        assert!(path.exists());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();
        store.append_set(1, set("7", 1)).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != SNAPSHOT_FILE)
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only {}, found extras: {:?}",
            SNAPSHOT_FILE,
            extras
        );
    }

    #[test]
    fn test_failed_write_keeps_memory_unchanged() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");
        let path = data_dir.join(SNAPSHOT_FILE);

        let mut store = SessionStore::open(&path).unwrap();
        store.create(routine(), t(0, 0)).unwrap();

        // Replace the data directory with a plain file so the write fails
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "not a directory").unwrap();

        let result = store.append_set(0, set("1", 1));
        assert!(matches!(result, Err(Error::Persistence(_))));
        assert_eq!(store.current().unwrap().logged_set_count(), 0);
    }
}
