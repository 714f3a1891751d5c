//! HTTP client for the remote workout service.
//!
//! Endpoints used:
//! - `GET  {base}/prs/{user}/{exercise}` returns `{"set_1": {"max_weight", "max_reps"}, ...}`
//! - `POST {base}/workouts/{user}` with `{start_time, end_time, sets}`

use crate::config::BackendConfig;
use crate::history::PrSource;
use crate::wal::WorkoutSink;
use crate::{CompletedWorkout, Error, PersonalRecord, Receipt, Result, SetRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Blocking client for the workout service
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    base_url: String,
}

/// PR entry as returned by the service; fields may be null
#[derive(Debug, Deserialize)]
struct PrEntry {
    max_weight: Option<f64>,
    max_reps: Option<u32>,
}

/// Submission body; the service assigns its own workout id
#[derive(Debug, Serialize)]
struct WorkoutBody<'a> {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    sets: &'a [SetRecord],
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Submission handle bound to one user
    pub fn for_user(&self, user_id: impl Into<String>) -> UserBackend<'_> {
        UserBackend {
            backend: self,
            user_id: user_id.into(),
        }
    }

    fn prs_url(&self, user_id: &str, exercise_id: &str) -> String {
        format!("{}/prs/{}/{}", self.base_url, user_id, exercise_id)
    }

    fn workouts_url(&self, user_id: &str) -> String {
        format!("{}/workouts/{}", self.base_url, user_id)
    }
}

/// Per-user view of the backend for submission
pub struct UserBackend<'a> {
    backend: &'a HttpBackend,
    user_id: String,
}

impl PrSource for HttpBackend {
    fn personal_record(
        &self,
        user_id: &str,
        exercise_id: &str,
        set_number: u32,
    ) -> Result<Option<PersonalRecord>> {
        let url = self.prs_url(user_id, exercise_id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::Lookup(format!("GET {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Lookup(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let body: HashMap<String, PrEntry> = response
            .json()
            .map_err(|e| Error::Lookup(format!("bad PR response from {}: {}", url, e)))?;
        Ok(pr_for_set(&body, set_number))
    }
}

impl WorkoutSink for UserBackend<'_> {
    fn submit(&mut self, workout: &CompletedWorkout) -> Result<Receipt> {
        let url = self.backend.workouts_url(&self.user_id);
        let body = WorkoutBody {
            start_time: workout.start_time,
            end_time: workout.end_time,
            sets: &workout.sets,
        };

        let response = self
            .backend
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| Error::Submission(format!("POST {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Submission(format!("POST {} returned {}", url, status)));
        }

        tracing::info!("Workout {} accepted by {}", workout.id, self.backend.base_url);
        Ok(Receipt::for_workout(workout))
    }
}

/// Pick the `set_N` entry; a missing or zero weight counts as no data
fn pr_for_set(body: &HashMap<String, PrEntry>, set_number: u32) -> Option<PersonalRecord> {
    let entry = body.get(&format!("set_{}", set_number))?;
    match (entry.max_weight, entry.max_reps) {
        (Some(w), Some(r)) if w > 0.0 => Some(PersonalRecord {
            max_weight: w,
            max_reps: r,
        }),
        _ => None,
    }
}
