use clap::{Parser, Subcommand};
use lift_core::config::BackendKind;
use lift_core::rest::format_elapsed;
use lift_core::*;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

mod ticker;

use ticker::Ticker;

/// How long the prompt waits for a PR lookup before showing without one
const LOOKUP_WAIT: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Strength training session tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workout from a routine file and log sets interactively
    Start {
        /// Routine TOML file listing the exercises in order
        #[arg(long)]
        routine: PathBuf,
    },

    /// Continue the workout in progress (default)
    Resume,

    /// Show the workout in progress
    Status,

    /// Submit the workout in progress
    Finish,

    /// Discard the workout in progress without submitting
    Cancel,

    /// Roll up the workout log to CSV
    Rollup {
        /// Clean up processed log files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    lift_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(data_dir);

    match cli.command {
        Some(Commands::Start { routine }) => cmd_start(&paths, &config, &routine),
        Some(Commands::Resume) | None => cmd_resume(&paths, &config),
        Some(Commands::Status) => cmd_status(&paths, &config),
        Some(Commands::Finish) => cmd_finish(&paths, &config),
        Some(Commands::Cancel) => cmd_cancel(&paths, &config),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
    }
}

/// File layout under the data directory
struct DataPaths {
    data_dir: PathBuf,
    snapshot: PathBuf,
    log: PathBuf,
    csv: PathBuf,
}

impl DataPaths {
    fn new(data_dir: PathBuf) -> Self {
        Self {
            snapshot: data_dir.join(store::SNAPSHOT_FILE),
            log: data_dir.join("workouts.jsonl"),
            csv: data_dir.join("sets.csv"),
            data_dir,
        }
    }
}

fn open_engine(paths: &DataPaths, config: &Config) -> Result<WorkoutEngine<SystemClock>> {
    std::fs::create_dir_all(&paths.data_dir)?;
    let store = SessionStore::open(&paths.snapshot)?;
    WorkoutEngine::open(store, SystemClock, config.session.clone())
}

/// Where finished workouts go
enum Backend {
    Local(JsonlWorkoutLog),
    Http {
        backend: HttpBackend,
        user_id: String,
    },
}

impl Backend {
    fn from_config(config: &Config, paths: &DataPaths) -> Result<Self> {
        Ok(match config.backend.kind {
            BackendKind::Local => Backend::Local(JsonlWorkoutLog::new(&paths.log)),
            BackendKind::Http => Backend::Http {
                backend: HttpBackend::new(&config.backend)?,
                user_id: config.backend.user_id.clone(),
            },
        })
    }

    /// PR source for the lookup worker thread
    fn pr_source(config: &Config, paths: &DataPaths) -> Result<Box<dyn PrSource + Send>> {
        let source: Box<dyn PrSource + Send> = match config.backend.kind {
            BackendKind::Local => Box::new(WorkoutHistory::new(&paths.log, &paths.csv)),
            BackendKind::Http => Box::new(HttpBackend::new(&config.backend)?),
        };
        Ok(source)
    }

    fn finish(&mut self, engine: &mut WorkoutEngine<SystemClock>) -> Result<Receipt> {
        match self {
            Backend::Local(log) => engine.finish(log),
            Backend::Http { backend, user_id } => {
                engine.finish(&mut backend.for_user(user_id.as_str()))
            }
        }
    }
}

fn cmd_start(paths: &DataPaths, config: &Config, routine_path: &Path) -> Result<()> {
    let exercises = Routine::load_from(routine_path)?.into_exercises()?;
    let mut engine = open_engine(paths, config)?;

    if engine.session().is_some() {
        eprintln!("A workout is already in progress. Use `liftlog resume` or `liftlog cancel`.");
        return Err(Error::SessionInProgress);
    }

    let session = engine.start(exercises)?;
    println!(
        "Started workout with {} exercises at {}",
        session.exercises.len(),
        session.start_time.format("%H:%M:%S")
    );

    Interactive::new(engine, paths, config)?.run()
}

fn cmd_resume(paths: &DataPaths, config: &Config) -> Result<()> {
    let engine = open_engine(paths, config)?;
    let Some(session) = engine.session() else {
        println!("No workout in progress. Start one with `liftlog start --routine FILE`.");
        return Ok(());
    };

    println!(
        "Resuming workout started at {} ({} sets logged)",
        session.start_time.format("%Y-%m-%d %H:%M:%S"),
        session.logged_set_count()
    );

    Interactive::new(engine, paths, config)?.run()
}

fn cmd_status(paths: &DataPaths, config: &Config) -> Result<()> {
    let engine = open_engine(paths, config)?;
    if engine.session().is_none() {
        println!("No workout in progress.");
        return Ok(());
    }
    print_status(&engine);
    Ok(())
}

fn cmd_finish(paths: &DataPaths, config: &Config) -> Result<()> {
    let mut engine = open_engine(paths, config)?;
    let mut backend = Backend::from_config(config, paths)?;
    let receipt = backend.finish(&mut engine)?;
    print_receipt(&receipt);
    Ok(())
}

fn cmd_cancel(paths: &DataPaths, config: &Config) -> Result<()> {
    let mut engine = open_engine(paths, config)?;
    let had_session = engine.session().is_some();
    engine.cancel()?;

    if had_session {
        println!("✓ Workout discarded");
    } else {
        println!("No workout in progress.");
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.log.exists() {
        println!("No workout log found - nothing to roll up.");
        return Ok(());
    }

    let count = lift_core::csv_rollup::log_to_csv_and_archive(&paths.log, &paths.csv)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = lift_core::csv_rollup::cleanup_processed_logs(&paths.data_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed log files", cleaned);
        }
    }

    Ok(())
}

fn print_status(engine: &WorkoutEngine<SystemClock>) {
    let Some(session) = engine.session() else {
        return;
    };
    let active = engine.active_exercise();

    println!();
    println!(
        "Workout started {}  elapsed {}",
        session.start_time.format("%H:%M:%S"),
        format_elapsed(engine.elapsed().unwrap_or_else(chrono::Duration::zero))
    );
    for (i, exercise) in session.exercises.iter().enumerate() {
        let marker = if active == Some(i) { '>' } else { ' ' };
        let state = match exercise.state() {
            SetState::Pending(n) => format!("set {}/{}", n, SET_CAP),
            SetState::Done => "done".to_string(),
        };
        let sets: Vec<String> = exercise
            .sets
            .iter()
            .map(|s| format!("{}x{}", s.weight, s.reps))
            .collect();
        println!(
            " {} {}. {:<24} {:<8} {}",
            marker,
            i + 1,
            exercise.exercise.name,
            state,
            sets.join(", ")
        );
    }

    let rest = engine.rest_status();
    if rest.is_active() {
        println!("  Rest {}", rest.display());
    }
    if session.is_complete() {
        println!("All exercises complete. Enter 'f' to finish.");
    }
}

fn print_receipt(receipt: &Receipt) {
    println!(
        "✓ Workout submitted: {} sets ({} to {})",
        receipt.submitted_sets,
        receipt.start_time.format("%H:%M:%S"),
        receipt.end_time.format("%H:%M:%S")
    );
}

struct LookupRequest {
    ticket: LookupTicket,
    exercise_id: String,
}

type LookupReply = (LookupTicket, Result<Option<PersonalRecord>>);

/// Run PR lookups off the input thread
fn spawn_lookup_worker(
    source: Box<dyn PrSource + Send>,
    user_id: String,
) -> (Sender<LookupRequest>, Receiver<LookupReply>) {
    let (request_tx, request_rx) = channel::<LookupRequest>();
    let (reply_tx, reply_rx) = channel();

    std::thread::spawn(move || {
        while let Ok(mut request) = request_rx.recv() {
            // Only the newest request can still be current
            while let Ok(next) = request_rx.try_recv() {
                request = next;
            }
            let result = source.personal_record(
                &user_id,
                &request.exercise_id,
                request.ticket.set_number,
            );
            if reply_tx.send((request.ticket, result)).is_err() {
                break;
            }
        }
    });

    (request_tx, reply_rx)
}

enum Flow {
    Continue,
    Exit,
}

/// Line-driven logging loop over stdin
struct Interactive {
    engine: WorkoutEngine<SystemClock>,
    backend: Backend,
    /// Exercise chosen with `ex N`; otherwise the active one
    selected: Option<usize>,
    suggestion: Option<Suggestion>,
    requests: Sender<LookupRequest>,
    replies: Receiver<LookupReply>,
    ticker: Option<Ticker>,
    tty: bool,
}

impl Interactive {
    fn new(engine: WorkoutEngine<SystemClock>, paths: &DataPaths, config: &Config) -> Result<Self> {
        let backend = Backend::from_config(config, paths)?;
        let (requests, replies) = spawn_lookup_worker(
            Backend::pr_source(config, paths)?,
            config.backend.user_id.clone(),
        );

        Ok(Self {
            engine,
            backend,
            selected: None,
            suggestion: None,
            requests,
            replies,
            ticker: None,
            tty: io::stdout().is_terminal(),
        })
    }

    fn run(mut self) -> Result<()> {
        print_help();
        print_status(&self.engine);
        self.request_suggestion();
        self.prompt()?;
        self.start_ticker();

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            self.stop_ticker();
            self.drain_replies();

            if let Flow::Exit = self.handle(line.trim()) {
                return Ok(());
            }
            self.prompt()?;
            self.start_ticker();
        }

        self.stop_ticker();
        println!();
        println!("Workout saved. Continue with `liftlog resume`.");
        Ok(())
    }

    /// Exercise the next logged set goes to
    fn target(&self) -> Option<usize> {
        match self.selected {
            Some(i) if matches!(self.engine.exercise_state(i), Some(SetState::Pending(_))) => {
                Some(i)
            }
            _ => self.engine.active_exercise(),
        }
    }

    fn handle(&mut self, input: &str) -> Flow {
        match input {
            "" | "s" => {
                if self.engine.skip_rest() {
                    println!("Rest skipped.");
                }
            }
            "y" => self.accept_suggestion(),
            "?" => print_status(&self.engine),
            "h" | "help" => print_help(),
            "f" => match self.backend.finish(&mut self.engine) {
                Ok(receipt) => {
                    print_receipt(&receipt);
                    return Flow::Exit;
                }
                Err(e) => {
                    println!("! Submission failed: {}", e);
                    println!("  The workout is kept. Enter 'f' to retry.");
                }
            },
            "c" => match self.engine.cancel() {
                Ok(()) => {
                    println!("✓ Workout discarded");
                    return Flow::Exit;
                }
                Err(e) => println!("! {}", e),
            },
            "q" => {
                println!("Workout saved. Continue with `liftlog resume`.");
                return Flow::Exit;
            }
            _ => {
                if let Some(arg) = input.strip_prefix("ex ") {
                    self.select(arg.trim());
                } else {
                    self.log_input(input);
                }
            }
        }
        Flow::Continue
    }

    fn select(&mut self, arg: &str) {
        let count = self.engine.session().map_or(0, |s| s.exercises.len());
        match arg.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => match self.engine.exercise_state(n - 1) {
                Some(SetState::Done) => println!("Exercise {} is already done.", n),
                _ => {
                    self.selected = Some(n - 1);
                    self.request_suggestion();
                }
            },
            _ => println!("! Choose an exercise between 1 and {}", count),
        }
    }

    fn log_input(&mut self, input: &str) {
        let Some(index) = self.target() else {
            println!("All exercises complete. Enter 'f' to finish.");
            return;
        };
        match Measurement::parse(input, self.engine.config()) {
            Ok(measurement) => self.log(index, measurement),
            Err(e) => println!("! {} (enter 'h' for help)", e),
        }
    }

    fn accept_suggestion(&mut self) {
        if self.suggestion.is_none() {
            self.wait_for_reply(LOOKUP_WAIT);
        }
        let Some(s) = self.suggestion else {
            println!("No suggestion available.");
            return;
        };
        match Measurement::quantize(Some(s.weight), Some(f64::from(s.reps)), self.engine.config()) {
            Ok(measurement) => self.log(s.exercise_index, measurement),
            Err(e) => println!("! {}", e),
        }
    }

    fn log(&mut self, index: usize, measurement: Measurement) {
        let record = match self.engine.log_measurement(index, measurement) {
            Ok(record) => record,
            Err(e) => {
                println!("! {}", e);
                return;
            }
        };

        let name = self
            .engine
            .session()
            .map(|s| s.exercises[index].exercise.name.clone())
            .unwrap_or_default();
        println!(
            "✓ Logged set {} of {}: {} x {} (TUT {})",
            record.set_number,
            name,
            record.weight,
            record.reps,
            format_elapsed(record.time_under_tension())
        );

        if self.engine.exercise_state(index) == Some(SetState::Done) {
            println!("  {} complete", name);
            if self.selected == Some(index) {
                self.selected = None;
            }
        }
        if self.engine.active_exercise().is_none() {
            println!("All exercises complete. Enter 'f' to finish.");
        }

        self.request_suggestion();
    }

    /// Ask for the upcoming set's PR and wait up to `LOOKUP_WAIT` for it.
    ///
    /// Late answers are picked up before the next command.
    fn request_suggestion(&mut self) {
        self.suggestion = None;
        let Some(index) = self.target() else {
            return;
        };
        let (Some(ticket), Some(session)) = (self.engine.lookup_ticket(index), self.engine.session())
        else {
            return;
        };

        let request = LookupRequest {
            ticket,
            exercise_id: session.exercises[index].exercise.id.clone(),
        };
        if self.requests.send(request).is_err() {
            tracing::warn!("PR lookup worker is gone");
            return;
        }

        self.wait_for_reply(LOOKUP_WAIT);
    }

    fn wait_for_reply(&mut self, wait: Duration) {
        let deadline = Instant::now() + wait;
        while self.suggestion.is_none() {
            let wait = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(wait) {
                Ok((ticket, result)) => {
                    self.suggestion = self.engine.resolve_suggestion(ticket, result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!("PR lookup still pending");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn drain_replies(&mut self) {
        while let Ok((ticket, result)) = self.replies.try_recv() {
            if let Some(s) = self.engine.resolve_suggestion(ticket, result) {
                if self.suggestion.is_none() {
                    println!("Suggestion ready: {} x {}", s.weight, s.reps);
                }
                self.suggestion = Some(s);
            }
        }
    }

    fn start_ticker(&mut self) {
        if !self.tty || self.ticker.is_some() {
            return;
        }
        if let Some(session) = self.engine.session() {
            self.ticker = Some(Ticker::spawn(self.engine.rest_timer(), session.start_time));
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn prompt(&self) -> Result<()> {
        let mut line = String::new();
        if let (Some(index), Some(session)) = (self.target(), self.engine.session()) {
            let exercise = &session.exercises[index];
            if let SetState::Pending(n) = exercise.state() {
                line.push_str(&format!("[{} set {}/{}]", exercise.exercise.name, n, SET_CAP));
            }
        }
        if let Some(s) = self.suggestion {
            let source = match s.source {
                SuggestionSource::PersonalRecord => "PR",
                SuggestionSource::NoData => "default",
            };
            line.push_str(&format!(" suggested {} x {} ({})", s.weight, s.reps, source));
        }

        println!("{}", line.trim_start());
        if let (true, Some(session)) = (self.tty, self.engine.session()) {
            // Ticker redraws this line
            println!(
                "{}",
                ticker::clock_line(self.engine.rest_timer(), session.start_time, self.engine.now())
            );
        }
        print!("> ");
        io::stdout().flush()?;
        Ok(())
    }
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  <weight> <reps>  log a set      y  accept suggestion");
    println!("  s or Enter       skip rest      ex N  select exercise");
    println!("  ?  status   f  finish   c  cancel   q  quit (keeps workout)");
    println!("─────────────────────────────────────────");
}
