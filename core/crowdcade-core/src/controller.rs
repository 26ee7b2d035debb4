//! The controller: owns the polling/resolution/dispatch cadence and wires
//! every component together.
//!
//! The actuator's run loop is thread-affine, so `run` hands the calling
//! thread over to it and does all timer-driven work on worker threads:
//!
//! - poll: fetch reactions/comments, ingest, publish the vote breakdown
//! - countdown: once a second, publish countdown/uptime and, at zero,
//!   resolve consensus and enqueue at most one action
//! - persistence: periodic session snapshot plus actuator save state
//!
//! All shared mutable state (the current-signals and last-changed pair) sits
//! behind one mutex; every reader takes a consistent snapshot, never a torn
//! read.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::config::ControllerConfig;
use crate::dispatch::{DispatchHandle, Dispatcher};
use crate::error::{ControllerError, SourceError};
use crate::resolver::resolve_action;
use crate::session::{SessionSnapshot, SessionStore};
use crate::source::SignalSource;
use crate::telemetry::{OverlaySink, TelemetryPublisher};
use crate::tracker::ActivityTracker;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

/// The mutexed pair: current signals + last-changed record, plus the comment
/// watermark. Mutated only by the poll thread; read as snapshots elsewhere.
struct CrowdState {
    tracker: ActivityTracker,
    comment_watermark: DateTime<Utc>,
}

pub struct Controller {
    config: ControllerConfig,
    source: Arc<dyn SignalSource>,
    telemetry: Arc<TelemetryPublisher>,
    store: SessionStore,
    resource_path: PathBuf,
    state: Arc<Mutex<CrowdState>>,
    phase: Arc<Mutex<ControllerPhase>>,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        source: Arc<dyn SignalSource>,
        sink: Box<dyn OverlaySink>,
        resource_path: PathBuf,
    ) -> Self {
        let store = SessionStore::new(&config.save_root, &resource_path);
        Self {
            config,
            source,
            telemetry: Arc::new(TelemetryPublisher::new(sink)),
            store,
            resource_path,
            state: Arc::new(Mutex::new(CrowdState {
                tracker: ActivityTracker::new(),
                comment_watermark: Utc::now(),
            })),
            phase: Arc::new(Mutex::new(ControllerPhase::Idle)),
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
            .lock()
            .map(|phase| *phase)
            .unwrap_or(ControllerPhase::Stopped)
    }

    fn set_phase(&self, next: ControllerPhase) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = next;
        }
    }

    /// Runs the session to completion.
    ///
    /// Blocks the calling thread inside the actuator's run loop until that
    /// loop exits, then flushes a final snapshot and stops every worker.
    pub fn run(&self, actuator: Arc<dyn Actuator>) -> Result<(), ControllerError> {
        let started_at = Utc::now();
        self.set_phase(ControllerPhase::Running);
        info!(resource = %self.resource_path.display(), "Controller starting");

        self.restore_session(actuator.as_ref());

        if let Err(err) = self
            .telemetry
            .publish_defaults(started_at, &self.config.actions)
        {
            warn!(error = %err, "Failed to publish overlay defaults");
        }

        // Dropping this sender is the shutdown signal for every timer thread.
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();

        let telemetry = Arc::clone(&self.telemetry);
        let dispatcher = Dispatcher::spawn(
            Arc::clone(&actuator),
            self.config.press_duration(),
            Some(Box::new(move |stats| {
                if let Err(err) = telemetry.publish_dispatch_stats(&stats) {
                    warn!(error = %err, "Failed to publish dispatch stats");
                }
            })),
        );

        let mut workers = Vec::new();
        workers.push(self.spawn_poll_thread(shutdown_rx.clone()));
        workers.push(self.spawn_countdown_thread(shutdown_rx.clone(), dispatcher.handle(), started_at));
        workers.push(self.spawn_persist_thread(shutdown_rx, Arc::clone(&actuator)));

        // Hard external constraint: the actuator owns this thread until its
        // loop exits.
        let run_result = actuator.run(&self.resource_path);

        self.set_phase(ControllerPhase::ShuttingDown);
        info!("Actuator loop exited; shutting down");
        drop(shutdown_tx);

        for worker in workers {
            if worker.join().is_err() {
                warn!("Controller worker thread panicked");
            }
        }

        self.flush_session(actuator.as_ref());
        dispatcher.shutdown();
        self.set_phase(ControllerPhase::Stopped);
        info!("Controller stopped");

        run_result.map_err(ControllerError::from)
    }

    /// Seeds tracker state from a prior snapshot and reloads the actuator's
    /// save state when one exists. Failures here fall back to a fresh start;
    /// they never abort the session.
    fn restore_session(&self, actuator: &dyn Actuator) {
        match self.store.restore() {
            Ok(Some(snapshot)) => {
                info!(
                    participants = snapshot.last_changed.len(),
                    path = %self.store.snapshot_path().display(),
                    "Restored session snapshot"
                );
                if let Ok(mut state) = self.state.lock() {
                    state.tracker =
                        ActivityTracker::from_parts(snapshot.past_signals, snapshot.last_changed);
                }
                let resume_path = self.store.resume_path();
                if resume_path.exists() {
                    if let Err(err) = actuator.load_state(&resume_path) {
                        warn!(error = %err, "Failed to load actuator save state; continuing fresh");
                    }
                }
            }
            Ok(None) => {
                info!("No prior session snapshot; starting fresh");
            }
            Err(err) => {
                warn!(error = %err, "Failed to read session snapshot; starting fresh");
            }
        }
    }

    fn current_snapshot(&self) -> Option<SessionSnapshot> {
        let state = self.state.lock().ok()?;
        Some(SessionSnapshot {
            past_signals: state.tracker.current_signals().clone(),
            last_changed: state.tracker.last_changed().clone(),
            ..SessionSnapshot::empty(self.store.resume_path(), self.resource_path.clone())
        })
    }

    /// Best-effort persistence: a failed checkpoint is reported, not fatal.
    fn flush_session(&self, actuator: &dyn Actuator) {
        if let Some(snapshot) = self.current_snapshot() {
            match self.store.persist(&snapshot) {
                Ok(()) => debug!(path = %self.store.snapshot_path().display(), "Session snapshot written"),
                Err(err) => warn!(error = %err, "Failed to persist session snapshot"),
            }
        }
        if let Err(err) = actuator.save_state(&self.store.resume_path()) {
            warn!(error = %err, "Failed to save actuator state");
        }
    }

    fn spawn_poll_thread(&self, shutdown_rx: Receiver<()>) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let telemetry = Arc::clone(&self.telemetry);
        let mapping = self.config.actions.clone();
        let cutoff = self.config.inactivity_cutoff();
        let escalation_threshold = self.config.max_consecutive_poll_failures;
        let ticker = crossbeam_channel::tick(self.config.poll_interval());

        thread::spawn(move || {
            let mut consecutive_failures: u32 = 0;
            loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {}
                    recv(shutdown_rx) -> _ => break,
                }

                match source.fetch_reactions() {
                    Ok(signals) => {
                        consecutive_failures = 0;
                        let now = Utc::now();
                        let Ok(mut state) = state.lock() else {
                            warn!("Crowd state lock poisoned; skipping poll");
                            continue;
                        };
                        state.tracker.ingest(&signals, now);
                        let active = state.tracker.active_participants(now, cutoff);
                        let tally = state.tracker.tally(&active);
                        let active_count = active.len();
                        drop(state);

                        debug!(active = active_count, "Poll applied");
                        if let Err(err) = telemetry.publish_vote_breakdown(&tally, &mapping) {
                            warn!(error = %err, "Failed to publish vote breakdown");
                        }
                    }
                    Err(err) => {
                        consecutive_failures += 1;
                        report_poll_failure(&err, consecutive_failures, escalation_threshold);
                    }
                }

                poll_comments(source.as_ref(), &state);
            }
        })
    }

    fn spawn_countdown_thread(
        &self,
        shutdown_rx: Receiver<()>,
        dispatch: DispatchHandle,
        started_at: DateTime<Utc>,
    ) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let telemetry = Arc::clone(&self.telemetry);
        let mapping = self.config.actions.clone();
        let cutoff = self.config.inactivity_cutoff();
        let action_interval = self.config.action_interval_secs;
        let ticker = crossbeam_channel::tick(HEARTBEAT_INTERVAL);

        thread::spawn(move || {
            let mut remaining = action_interval;
            loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {}
                    recv(shutdown_rx) -> _ => break,
                }

                if let Err(err) = telemetry.publish_countdown(remaining) {
                    warn!(error = %err, "Failed to publish countdown");
                }
                if let Err(err) = telemetry.publish_uptime(started_at, Utc::now()) {
                    warn!(error = %err, "Failed to publish uptime");
                }

                remaining = remaining.saturating_sub(1);
                let resolve_now = remaining == 0;
                if resolve_now {
                    remaining = action_interval;
                }

                // One consistent snapshot for both the heartbeat fields and
                // the resolution.
                let (active_count, tally) = {
                    let Ok(state) = state.lock() else {
                        warn!("Crowd state lock poisoned; skipping heartbeat");
                        continue;
                    };
                    let now = Utc::now();
                    let active = state.tracker.active_participants(now, cutoff);
                    let tally = state.tracker.tally(&active);
                    (active.len(), tally)
                };

                if let Err(err) = telemetry.publish_active_participants(active_count) {
                    warn!(error = %err, "Failed to publish active participant count");
                }
                if !resolve_now {
                    continue;
                }

                match resolve_action(&tally, &mapping) {
                    Some(action) => {
                        debug!(action = action.label(), "Consensus resolved");
                        dispatch.enqueue(action);
                    }
                    None => {
                        debug!("No active mapped reactions; skipping press");
                    }
                }
            }
        })
    }

    fn spawn_persist_thread(
        &self,
        shutdown_rx: Receiver<()>,
        actuator: Arc<dyn Actuator>,
    ) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let store = self.store.clone();
        let resource_path = self.resource_path.clone();
        let ticker = crossbeam_channel::tick(self.config.persist_interval());

        thread::spawn(move || loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => {}
                recv(shutdown_rx) -> _ => break,
            }

            let snapshot = {
                let Ok(state) = state.lock() else {
                    warn!("Crowd state lock poisoned; skipping persistence");
                    continue;
                };
                SessionSnapshot {
                    past_signals: state.tracker.current_signals().clone(),
                    last_changed: state.tracker.last_changed().clone(),
                    ..SessionSnapshot::empty(store.resume_path(), resource_path.clone())
                }
            };

            match store.persist(&snapshot) {
                Ok(()) => debug!(path = %store.snapshot_path().display(), "Session snapshot written"),
                Err(err) => warn!(error = %err, "Failed to persist session snapshot"),
            }
            if let Err(err) = actuator.save_state(&store.resume_path()) {
                // Same policy as a storage failure: report and keep running.
                warn!(error = %err, "Failed to save actuator state");
            }
        })
    }
}

fn report_poll_failure(err: &SourceError, consecutive: u32, threshold: u32) {
    if consecutive == threshold {
        error!(
            error = %err,
            consecutive,
            "Signal source polling has failed repeatedly; retaining previous tally"
        );
    } else {
        warn!(error = %err, consecutive, "Signal source poll failed; retaining previous tally");
    }
}

fn poll_comments(source: &dyn SignalSource, state: &Mutex<CrowdState>) {
    let after = match state.lock() {
        Ok(state) => state.comment_watermark,
        Err(_) => return,
    };

    match source.fetch_comments(after) {
        Ok(comments) => {
            let mut latest = after;
            for comment in &comments {
                info!(
                    author = %comment.author_name,
                    message = %comment.message,
                    "Comment received"
                );
                latest = latest.max(comment.created_at);
            }
            if latest > after {
                if let Ok(mut state) = state.lock() {
                    state.comment_watermark = latest;
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "Failed to fetch comments");
        }
    }
}
