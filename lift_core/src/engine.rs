//! Active workout session engine.
//!
//! Turns a routine into a live session and drives it:
//! - Per-exercise set progression (`Pending(n)` → `Done`), capped at 3 sets
//! - Time-under-tension stamping from the pending-set start
//! - A workout-global rest countdown restarted after every logged set
//! - PR-seeded input suggestions that never block logging
//! - Finishing (submit, then clear) and cancelling
//!
//! Every mutation goes through the [`SessionStore`], which persists before
//! the change becomes visible. Rest and pending-set state are ephemeral and
//! rebuilt on resume.

use crate::config::SessionConfig;
use crate::history::PrSource;
use crate::measure::Measurement;
use crate::rest::{RestStatus, RestTimer};
use crate::store::SessionStore;
use crate::wal::WorkoutSink;
use crate::{
    Clock, CompletedWorkout, Error, ExerciseRef, PersonalRecord, Receipt, Result, Session,
    SetRecord, SetState, Suggestion, SuggestionSource,
};
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

/// Identifies which set a PR lookup was issued for.
///
/// A result is only applied if the same session is still active and the
/// exercise is still waiting on the same set number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupTicket {
    pub session_id: Uuid,
    pub exercise_index: usize,
    pub set_number: u32,
}

/// Drives the singleton workout session
pub struct WorkoutEngine<C: Clock> {
    store: SessionStore,
    clock: C,
    config: SessionConfig,
    rest: RestTimer,
    /// Start of the set currently being performed
    pending_start: Option<NaiveDateTime>,
}

impl<C: Clock> WorkoutEngine<C> {
    /// Wrap a store, resuming any session it holds.
    ///
    /// On resume the rest timer is idle and the pending set starts now.
    pub fn open(store: SessionStore, clock: C, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let pending_start = store.current().map(|session| {
            tracing::info!(
                "Resuming session {} started at {}",
                session.id,
                session.start_time
            );
            clock.now()
        });

        Ok(Self {
            rest: RestTimer::new(config.rest_seconds),
            store,
            clock,
            config,
            pending_start,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.store.current()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Begin a workout from a non-empty routine
    pub fn start(&mut self, exercises: Vec<ExerciseRef>) -> Result<&Session> {
        let now = self.clock.now();
        self.store.create(exercises, now)?;
        self.rest.cancel();
        self.pending_start = Some(now);
        self.session().ok_or(Error::NoActiveSession)
    }

    /// Lowest-indexed exercise still awaiting sets
    pub fn active_exercise(&self) -> Option<usize> {
        self.session().and_then(Session::active_exercise)
    }

    pub fn exercise_state(&self, index: usize) -> Option<SetState> {
        self.session().and_then(|s| s.exercise_state(index))
    }

    /// When the set being performed began
    pub fn pending_set_start(&self) -> Option<NaiveDateTime> {
        self.pending_start
    }

    /// Quantize raw input and log it as the next set of `index`
    pub fn log_set(
        &mut self,
        index: usize,
        weight: Option<f64>,
        reps: Option<f64>,
    ) -> Result<SetRecord> {
        self.check_loggable(index)?;
        let measurement = Measurement::quantize(weight, reps, &self.config)?;
        self.log_measurement(index, measurement)
    }

    /// Log an already-quantized measurement as the next set of `index`.
    ///
    /// On success the rest countdown restarts and the next set's
    /// time-under-tension starts at this set's end.
    pub fn log_measurement(&mut self, index: usize, measurement: Measurement) -> Result<SetRecord> {
        let set_number = self.check_loggable(index)?;
        let session = self.session().ok_or(Error::NoActiveSession)?;
        let exercise_id = session.exercises[index].exercise.id.clone();

        let now = self.clock.now();
        let start_time = self
            .pending_start
            .unwrap_or(session.start_time)
            .min(now);

        let record = SetRecord {
            exercise_id,
            set_number,
            weight: measurement.weight(),
            reps: measurement.reps(),
            start_time,
            end_time: now,
        };
        self.store.append_set(index, record.clone())?;

        self.rest.start(now);
        self.pending_start = Some(now);

        tracing::info!(
            "Logged set {} of exercise {} ({}): {} x {}",
            record.set_number,
            index,
            record.exercise_id,
            record.weight,
            record.reps
        );
        Ok(record)
    }

    /// Log the next set of the active exercise
    pub fn log_active_set(&mut self, weight: Option<f64>, reps: Option<f64>) -> Result<SetRecord> {
        let index = self.active_exercise().ok_or_else(|| match self.session() {
            None => Error::NoActiveSession,
            Some(_) => Error::InvalidInput("all exercises are complete".into()),
        })?;
        self.log_set(index, weight, reps)
    }

    /// Returns the set number `index` is waiting on
    fn check_loggable(&self, index: usize) -> Result<u32> {
        let session = self.session().ok_or(Error::NoActiveSession)?;
        match session.exercise_state(index) {
            None => Err(Error::InvalidInput(format!(
                "exercise index {} out of range (session has {})",
                index,
                session.exercises.len()
            ))),
            Some(SetState::Done) => Err(Error::CapacityExceeded {
                exercise_index: index,
                cap: crate::SET_CAP,
            }),
            Some(SetState::Pending(n)) => Ok(n),
        }
    }

    /// End the rest countdown now; the next set's time-under-tension
    /// starts at this moment. Returns whether a countdown was running.
    pub fn skip_rest(&mut self) -> bool {
        let now = self.clock.now();
        let cancelled = self.rest.cancel();
        self.pending_start = Some(now);
        tracing::info!("Rest skipped at {}", now);
        cancelled
    }

    pub fn rest_status(&self) -> RestStatus {
        self.rest.status(self.clock.now())
    }

    /// Copy of the countdown for display tasks
    pub fn rest_timer(&self) -> RestTimer {
        self.rest
    }

    pub fn elapsed(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.session().map(|s| s.elapsed(now))
    }

    /// Ticket for looking up the PR of the upcoming set of `index`
    pub fn lookup_ticket(&self, index: usize) -> Option<LookupTicket> {
        let session = self.session()?;
        match session.exercise_state(index)? {
            SetState::Pending(set_number) => Some(LookupTicket {
                session_id: session.id,
                exercise_index: index,
                set_number,
            }),
            SetState::Done => None,
        }
    }

    /// Turn a lookup result into a suggestion.
    ///
    /// Stale tickets yield `None`. Lookup failures degrade to the neutral
    /// default and are only logged.
    pub fn resolve_suggestion(
        &self,
        ticket: LookupTicket,
        result: Result<Option<PersonalRecord>>,
    ) -> Option<Suggestion> {
        if self.lookup_ticket(ticket.exercise_index) != Some(ticket) {
            tracing::debug!("Discarding stale PR lookup {:?}", ticket);
            return None;
        }

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "PR lookup for set {} of exercise {} failed: {}",
                    ticket.set_number,
                    ticket.exercise_index,
                    e
                );
                None
            }
        };

        let suggestion = match record.and_then(|pr| self.seed_from_record(pr)) {
            Some(m) => Suggestion {
                exercise_index: ticket.exercise_index,
                set_number: ticket.set_number,
                weight: m.weight(),
                reps: m.reps(),
                source: SuggestionSource::PersonalRecord,
            },
            None => Suggestion {
                exercise_index: ticket.exercise_index,
                set_number: ticket.set_number,
                weight: self.config.default_weight,
                reps: self.config.default_reps,
                source: SuggestionSource::NoData,
            },
        };
        Some(suggestion)
    }

    /// Query `source` and resolve the suggestion for the upcoming set
    pub fn suggest(&self, index: usize, source: &dyn PrSource, user_id: &str) -> Option<Suggestion> {
        let ticket = self.lookup_ticket(index)?;
        let exercise_id = self.session()?.exercises[index].exercise.id.clone();
        let result = source.personal_record(user_id, &exercise_id, ticket.set_number);
        self.resolve_suggestion(ticket, result)
    }

    /// Position a PR within the input range, as a selector would
    fn seed_from_record(&self, pr: PersonalRecord) -> Option<Measurement> {
        if pr.max_weight.is_nan() || pr.max_weight <= 0.0 {
            return None;
        }
        let weight = pr.max_weight.min(self.config.max_weight);
        let reps = f64::from(pr.max_reps.clamp(1, self.config.max_reps));
        Measurement::quantize(Some(weight), Some(reps), &self.config).ok()
    }

    /// Submit the workout and clear the session.
    ///
    /// On submission failure nothing changes and the call can be retried.
    pub fn finish(&mut self, sink: &mut dyn WorkoutSink) -> Result<Receipt> {
        let session = self.session().ok_or(Error::NoActiveSession)?;
        let workout = CompletedWorkout::from_session(session, self.clock.now());

        let receipt = match sink.submit(&workout) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!("Submitting workout {} failed: {}", workout.id, e);
                return Err(match e {
                    Error::Submission(_) => e,
                    other => Error::Submission(other.to_string()),
                });
            }
        };

        self.store.clear()?;
        self.rest.cancel();
        self.pending_start = None;

        tracing::info!(
            "Finished workout {} with {} sets",
            receipt.workout_id,
            receipt.submitted_sets
        );
        Ok(receipt)
    }

    /// Discard the session without submitting
    pub fn cancel(&mut self) -> Result<()> {
        let id = self.session().map(|s| s.id);
        self.store.clear()?;
        self.rest.cancel();
        self.pending_start = None;
        if let Some(id) = id {
            tracing::info!("Cancelled workout {}", id);
        }
        Ok(())
    }
}
