//! Single-consumer action dispatch.
//!
//! One unbounded queue, one worker thread. Producers never block: the
//! resolution tick enqueues at most one action per cycle and moves on. The
//! worker presses, holds for the configured duration, releases, then updates
//! the dispatch counters. At most one action is in flight at a time and
//! actions execute strictly in enqueue order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::actuator::Actuator;
use crate::signals::Action;

const RECENT_HISTORY_CAP: usize = 3;

/// Snapshot of the dispatch counters, readable by telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Monotonic count of completed press/release pairs.
    pub total_presses: u64,
    /// Most recent dispatched actions, most-recent-first, capped at 3.
    pub recent: Vec<Action>,
    /// Actions refused or discarded because of shutdown.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    total_presses: u64,
    recent: VecDeque<Action>,
    dropped: u64,
}

impl StatsInner {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            total_presses: self.total_presses,
            recent: self.recent.iter().copied().collect(),
            dropped: self.dropped,
        }
    }
}

/// Invoked after every completed dispatch with the updated counters.
pub type DispatchObserver = Box<dyn Fn(DispatchStats) + Send + Sync>;

/// Cloneable producer side of the queue.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: Sender<Action>,
    closed: Arc<AtomicBool>,
    stats: Arc<Mutex<StatsInner>>,
}

impl DispatchHandle {
    /// Enqueues an action without blocking.
    ///
    /// Returns false if the dispatcher has shut down; the refusal is counted
    /// in [`DispatchStats::dropped`] rather than silently lost.
    pub fn enqueue(&self, action: Action) -> bool {
        if self.closed.load(Ordering::SeqCst) || self.tx.send(action).is_err() {
            if let Ok(mut stats) = self.stats.lock() {
                stats.dropped += 1;
            }
            warn!(action = action.label(), "Dropped action enqueued after shutdown");
            return false;
        }
        true
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
            .lock()
            .map(|stats| stats.snapshot())
            .unwrap_or_default()
    }
}

/// Owner of the consumer thread. Producers hold [`DispatchHandle`] clones.
pub struct Dispatcher {
    handle: DispatchHandle,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Starts the consumer thread against the given actuator.
    pub fn spawn(
        actuator: Arc<dyn Actuator>,
        press_duration: Duration,
        observer: Option<DispatchObserver>,
    ) -> Self {
        let (tx, rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        let closed = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(StatsInner::default()));

        let worker_stats = Arc::clone(&stats);
        let worker_closed = Arc::clone(&closed);
        let worker = thread::spawn(move || {
            consume(rx, stop_rx, actuator, press_duration, worker_stats, worker_closed, observer);
        });

        Self {
            handle: DispatchHandle { tx, closed, stats },
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        self.handle.stats()
    }

    /// Stops the consumer. Any in-flight press finishes its hold and release
    /// first; actions still queued are counted as dropped.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.handle.closed.store(true, Ordering::SeqCst);
        // Dropping the stop sender wakes the worker even while producer
        // handles are still alive.
        drop(self.stop_tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Dispatch worker panicked during shutdown");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn consume(
    rx: Receiver<Action>,
    stop_rx: Receiver<()>,
    actuator: Arc<dyn Actuator>,
    press_duration: Duration,
    stats: Arc<Mutex<StatsInner>>,
    closed: Arc<AtomicBool>,
    observer: Option<DispatchObserver>,
) {
    loop {
        let action = crossbeam_channel::select! {
            recv(rx) -> msg => match msg {
                Ok(action) => action,
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        };

        if closed.load(Ordering::SeqCst) {
            // Shutdown raced an already-queued action; count it, don't press.
            if let Ok(mut stats) = stats.lock() {
                stats.dropped += 1;
            }
            continue;
        }

        if let Err(err) = actuator.apply_input(action, true) {
            warn!(error = %err, action = action.label(), "Actuator rejected press");
            continue;
        }
        thread::sleep(press_duration);
        if let Err(err) = actuator.apply_input(action, false) {
            warn!(error = %err, action = action.label(), "Actuator rejected release");
        }

        let snapshot = {
            let Ok(mut stats) = stats.lock() else {
                continue;
            };
            stats.total_presses += 1;
            stats.recent.push_front(action);
            stats.recent.truncate(RECENT_HISTORY_CAP);
            stats.snapshot()
        };
        debug!(
            action = action.label(),
            total = snapshot.total_presses,
            "Dispatched action"
        );

        if let Some(observer) = observer.as_ref() {
            observer(snapshot);
        }
    }

    // Count whatever never got dispatched.
    let undelivered = rx.try_iter().count() as u64;
    if undelivered > 0 {
        if let Ok(mut stats) = stats.lock() {
            stats.dropped += undelivered;
        }
        debug!(count = undelivered, "Discarded queued actions at shutdown");
    }
}
