//! Session drivers.
//!
//! `Session` advances a pipeline on a simulated clock: step k runs at
//! `start + k * tick_interval`, so a session is reproducible from its config.
//! `spawn_session` runs the same pipeline on a background thread against the
//! wall clock and publishes every step over a channel.
//!
//! With the journal enabled, records are written on a background thread and
//! the account balance is restored from and saved to the account file.
//!
//! Stopping a session halts future steps only. OPEN positions are left as
//! they are and are not settled until a pipeline steps again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use papertrade_core::domain::Position;
use papertrade_core::sink::{NullSink, RecordSink};
use papertrade_core::{OperatingMode, Pipeline, PipelineError, StepOutput};

use crate::account::{restore_balance, save_account};
use crate::config::{ConfigError, SessionConfig};
use crate::journal::{CsvJournal, JournalError};
use crate::summary::PerformanceSummary;
use crate::writer::BackgroundSink;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Final state of a session, suitable for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub seed: u64,
    pub steps: u64,
    pub candles_sealed: usize,
    pub summary: PerformanceSummary,
    pub positions: Vec<Position>,
}

pub struct Session {
    config: SessionConfig,
    session_id: String,
    pipeline: Pipeline,
    start: DateTime<Utc>,
    next_step: u64,
    candles_sealed: usize,
}

impl Session {
    /// Build a session whose records go to the CSV journal when enabled.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let sink: Box<dyn RecordSink> = if config.journal.enabled {
            let journal = CsvJournal::open(&config.journal)?;
            Box::new(BackgroundSink::spawn(journal).map_err(SessionError::Spawn)?)
        } else {
            Box::new(NullSink)
        };
        Self::with_sink(config, sink)
    }

    pub fn with_sink(mut config: SessionConfig, sink: Box<dyn RecordSink>) -> Result<Self, SessionError> {
        if config.journal.enabled {
            config.pipeline.account =
                restore_balance(&config.journal.account_path(), config.pipeline.account);
        }
        config.validate().map_err(ConfigError::from)?;
        let session_id = config.session_id()?;
        let pipeline = Pipeline::new(config.pipeline.clone(), sink)?;
        let start = config.start_time.unwrap_or_else(Utc::now);
        info!(
            session = %&session_id[..12],
            seed = config.pipeline.seed,
            start = %start,
            "session created"
        );
        Ok(Self {
            config,
            session_id,
            pipeline,
            start,
            next_step: 0,
            candles_sealed: 0,
        })
    }

    /// Simulated time of step `k`.
    pub fn time_of_step(&self, k: u64) -> DateTime<Utc> {
        self.start + Duration::milliseconds(self.config.tick_interval_ms as i64 * k as i64)
    }

    /// Run one step on the simulated clock.
    pub fn step(&mut self) -> Result<StepOutput, SessionError> {
        let now = self.time_of_step(self.next_step);
        self.step_at(now)
    }

    fn step_at(&mut self, now: DateTime<Utc>) -> Result<StepOutput, SessionError> {
        let out = self.pipeline.step(now)?;
        self.next_step += 1;
        self.candles_sealed += out.sealed.len();
        for warning in &out.warnings {
            warn!(step = self.next_step, %warning, "step warning");
        }
        Ok(out)
    }

    /// Run `n` steps on the simulated clock and return their outputs.
    pub fn run_steps(&mut self, n: u64) -> Result<Vec<StepOutput>, SessionError> {
        (0..n).map(|_| self.step()).collect()
    }

    /// Run the configured number of steps and report.
    pub fn run(mut self) -> Result<SessionReport, SessionError> {
        let steps = self.config.steps;
        info!(steps, "session started");
        for _ in 0..steps {
            self.step()?;
        }
        self.persist();
        let report = self.report();
        info!(
            steps = report.steps,
            settled = report.summary.total_settled,
            net_pnl = report.summary.net_pnl,
            "session finished"
        );
        Ok(report)
    }

    /// Write out queued records and, with the journal enabled, the account.
    ///
    /// Failures are logged; the in-memory session is unaffected.
    pub fn persist(&mut self) {
        if let Err(err) = self.pipeline.flush_records() {
            error!(error = %err, "failed to flush records");
        }
        if self.config.journal.enabled {
            let path = self.config.journal.account_path();
            if let Err(err) = save_account(&path, self.pipeline.account()) {
                error!(error = %err, "failed to save account");
            }
        }
    }

    pub fn summary(&self) -> PerformanceSummary {
        let positions = self.pipeline.positions();
        PerformanceSummary::from_positions(
            positions.positions(),
            positions.starting_balance(),
            positions.account().balance,
        )
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            seed: self.config.pipeline.seed,
            steps: self.next_step,
            candles_sealed: self.candles_sealed,
            summary: self.summary(),
            positions: self.pipeline.positions().positions().to_vec(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.pipeline.set_mode(mode);
    }

    pub fn steps_run(&self) -> u64 {
        self.next_step
    }
}

// ── Background worker ────────────────────────────────────────────────

/// Commands accepted by a running session worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    SetMode(OperatingMode),
}

/// Events published by the session worker.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Step(Box<StepOutput>),
    Finished(Box<SessionReport>),
    Failed { error: String },
}

/// Handle to a session running on its own thread.
pub struct SessionHandle {
    stop: Arc<AtomicBool>,
    commands: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    /// Ask the worker to stop after its current step.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn set_mode(&self, mode: OperatingMode) {
        // A send error means the worker already exited.
        let _ = self.commands.send(SessionCommand::SetMode(mode));
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker and wait for it. Remaining events stay readable.
    pub fn shutdown(self) -> Receiver<SessionEvent> {
        self.stop();
        if self.join.join().is_err() {
            error!("session worker panicked");
        }
        self.events
    }
}

/// Run a session on a background thread against the wall clock.
///
/// The worker steps every `tick_interval_ms`, runs `steps` steps (forever
/// when 0) or until stopped, and ends with `Finished` or `Failed`.
pub fn spawn_session(session: Session) -> Result<SessionHandle, SessionError> {
    let stop = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();

    let worker_stop = Arc::clone(&stop);
    let join = thread::Builder::new()
        .name("papertrade-session".into())
        .spawn(move || session_loop(session, command_rx, event_tx, worker_stop))
        .map_err(SessionError::Spawn)?;

    Ok(SessionHandle {
        stop,
        commands: command_tx,
        events: event_rx,
        join,
    })
}

fn session_loop(
    mut session: Session,
    commands: Receiver<SessionCommand>,
    events: Sender<SessionEvent>,
    stop: Arc<AtomicBool>,
) {
    let limit = session.config.steps;
    let interval = session.config.tick_interval();
    info!(session = %&session.session_id[..12], limit, "session worker started");
    let mut last_now = DateTime::<Utc>::MIN_UTC;

    while !stop.load(Ordering::Relaxed) && (limit == 0 || session.steps_run() < limit) {
        loop {
            match commands.try_recv() {
                Ok(SessionCommand::SetMode(mode)) => session.set_mode(mode),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        // Wall clocks can step backwards; the pipeline rejects that.
        last_now = last_now.max(Utc::now());
        match session.step_at(last_now) {
            Ok(out) => {
                if events.send(SessionEvent::Step(Box::new(out))).is_err() {
                    // Receiver dropped: nobody is listening any more.
                    break;
                }
            }
            Err(err) => {
                error!(error = %err, "session step failed");
                session.persist();
                let _ = events.send(SessionEvent::Failed {
                    error: err.to_string(),
                });
                return;
            }
        }

        sleep_unless_stopped(interval, &stop);
    }

    info!(steps = session.steps_run(), "session worker stopped");
    session.persist();
    let _ = events.send(SessionEvent::Finished(Box::new(session.report())));
}

/// Sleep for `interval` in short slices so a stop request is seen promptly.
fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) {
    let slice = std::time::Duration::from_millis(20);
    let deadline = std::time::Instant::now()
        + interval.to_std().unwrap_or(std::time::Duration::ZERO);
    while !stop.load(Ordering::Relaxed) {
        let now = std::time::Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade_core::sink::MemorySink;

    fn config(steps: u64) -> SessionConfig {
        let mut config = SessionConfig {
            steps,
            start_time: DateTime::from_timestamp(1_700_000_000, 0),
            ..SessionConfig::default()
        };
        config.journal.enabled = false;
        config
    }

    #[test]
    fn simulated_clock_advances_by_tick_interval() {
        let mut session = Session::new(config(10)).unwrap();
        let outputs = session.run_steps(3).unwrap();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(outputs[0].at, start);
        assert_eq!(outputs[2].at, start + Duration::seconds(4));
        assert_eq!(session.steps_run(), 3);
    }

    #[test]
    fn run_reports_configured_steps() {
        let report = Session::new(config(50)).unwrap().run().unwrap();
        assert_eq!(report.steps, 50);
        // 50 steps of 2 s span 98 s: 19 boundaries of 5 s candles.
        assert_eq!(report.candles_sealed, 19);
        assert_eq!(report.seed, 42);
    }

    #[test]
    fn sessions_are_reproducible() {
        let a = Session::new(config(400)).unwrap().run().unwrap();
        let b = Session::new(config(400)).unwrap().run().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_sink_is_used() {
        let mut session = Session::with_sink(config(0), Box::new(MemorySink::default())).unwrap();
        session.run_steps(10).unwrap();
        assert!(!session.pipeline().history().is_empty());
    }

    #[test]
    fn worker_publishes_steps_and_stops() {
        let mut cfg = config(0);
        cfg.tick_interval_ms = 10;
        cfg.start_time = None;
        let handle = spawn_session(Session::new(cfg).unwrap()).unwrap();

        let first = handle
            .events()
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert!(matches!(first, SessionEvent::Step(_)));

        handle.set_mode(OperatingMode::DataCollection);
        let events = handle.shutdown();
        let last = events.iter().last().unwrap();
        assert!(matches!(last, SessionEvent::Finished(_)));
    }

    #[test]
    fn worker_honours_step_limit() {
        let mut cfg = config(3);
        cfg.tick_interval_ms = 1;
        let handle = spawn_session(Session::new(cfg).unwrap()).unwrap();
        let events: Vec<_> = handle.events().iter().collect();
        let steps = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Step(_)))
            .count();
        assert_eq!(steps, 3);
        match events.last().unwrap() {
            SessionEvent::Finished(report) => assert_eq!(report.steps, 3),
            other => panic!("unexpected final event: {other:?}"),
        }
    }
}
