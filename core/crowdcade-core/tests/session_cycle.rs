//! Integration tests for the full controller cycle: poll, resolve, dispatch,
//! persist, restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crowdcade_core::config::ActionMapping;
use crowdcade_core::error::{ActuatorError, OverlayError, SourceError};
use crowdcade_core::telemetry::{OverlayField, OverlaySink};
use crowdcade_core::{
    Action, Actuator, Comment, Controller, ControllerConfig, ControllerPhase, Reaction,
    SessionStore, Signal, SignalSource,
};

#[derive(Default)]
struct MemorySink {
    fields: Mutex<HashMap<OverlayField, String>>,
}

impl MemorySink {
    fn field(&self, field: OverlayField) -> Option<String> {
        self.fields.lock().expect("fields lock").get(&field).cloned()
    }
}

impl OverlaySink for MemorySink {
    fn write_field(&self, field: OverlayField, text: &str) -> Result<(), OverlayError> {
        self.fields
            .lock()
            .expect("fields lock")
            .insert(field, text.to_string());
        Ok(())
    }
}

/// Returns a fixed reaction set on every poll and one comment feed entry.
struct FixedSource {
    signals: Vec<Signal>,
    comments: Vec<Comment>,
}

impl SignalSource for FixedSource {
    fn fetch_reactions(&self) -> Result<Vec<Signal>, SourceError> {
        Ok(self.signals.clone())
    }

    fn fetch_comments(&self, after: DateTime<Utc>) -> Result<Vec<Comment>, SourceError> {
        Ok(self
            .comments
            .iter()
            .filter(|comment| comment.created_at > after)
            .cloned()
            .collect())
    }
}

/// Records inputs and save requests; its run loop just blocks for a while,
/// the same shape as a real emulator loop.
struct FakeEmulator {
    run_for: Duration,
    inputs: Mutex<Vec<(Action, bool)>>,
    saves: Mutex<u32>,
    loads: Mutex<u32>,
}

impl FakeEmulator {
    fn new(run_for: Duration) -> Self {
        Self {
            run_for,
            inputs: Mutex::new(Vec::new()),
            saves: Mutex::new(0),
            loads: Mutex::new(0),
        }
    }

    fn pressed_actions(&self) -> Vec<Action> {
        self.inputs
            .lock()
            .expect("inputs lock")
            .iter()
            .filter(|(_, pressed)| *pressed)
            .map(|(action, _)| *action)
            .collect()
    }
}

impl Actuator for FakeEmulator {
    fn apply_input(&self, action: Action, pressed: bool) -> Result<(), ActuatorError> {
        self.inputs.lock().expect("inputs lock").push((action, pressed));
        Ok(())
    }

    fn save_state(&self, path: &Path) -> Result<(), ActuatorError> {
        *self.saves.lock().expect("saves lock") += 1;
        fs_err::write(path, b"save-state").map_err(|err| ActuatorError::Save {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
    }

    fn load_state(&self, _path: &Path) -> Result<(), ActuatorError> {
        *self.loads.lock().expect("loads lock") += 1;
        Ok(())
    }

    fn run(&self, _resource: &Path) -> Result<(), ActuatorError> {
        thread::sleep(self.run_for);
        Ok(())
    }
}

fn signal(id: &str, reaction: Reaction) -> Signal {
    Signal {
        participant_id: id.to_string(),
        participant_name: id.to_string(),
        reaction,
        observed_at: Utc::now(),
    }
}

fn fast_config(save_root: PathBuf) -> ControllerConfig {
    ControllerConfig {
        poll_interval_secs: 1,
        action_interval_secs: 2,
        press_duration_ms: 1,
        inactivity_cutoff_secs: 300,
        persist_interval_secs: 1,
        max_consecutive_poll_failures: 2,
        save_root,
        actions: ActionMapping::default(),
    }
}

#[test]
fn consensus_flows_from_reactions_to_button_presses() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let sink = Arc::new(MemorySink::default());
    let resource = PathBuf::from("/roms/adventure.nes");

    struct SharedSink(Arc<MemorySink>);
    impl OverlaySink for SharedSink {
        fn write_field(&self, field: OverlayField, text: &str) -> Result<(), OverlayError> {
            self.0.write_field(field, text)
        }
    }

    let source = Arc::new(FixedSource {
        signals: vec![
            signal("p1", Reaction::Wow),
            signal("p2", Reaction::Wow),
            signal("p3", Reaction::Sad),
        ],
        comments: vec![Comment {
            id: "c1".to_string(),
            created_at: Utc::now() + chrono::Duration::seconds(1),
            author_id: "p9".to_string(),
            author_name: "Joan".to_string(),
            message: "go right".to_string(),
        }],
    });

    let controller = Controller::new(
        fast_config(temp_dir.path().to_path_buf()),
        source,
        Box::new(SharedSink(Arc::clone(&sink))),
        resource.clone(),
    );
    let emulator = Arc::new(FakeEmulator::new(Duration::from_millis(3500)));

    controller
        .run(Arc::clone(&emulator) as Arc<dyn Actuator>)
        .expect("run");
    assert_eq!(controller.phase(), ControllerPhase::Stopped);

    // Wow holds the plurality, so every press is Right.
    let pressed = emulator.pressed_actions();
    assert!(!pressed.is_empty());
    assert!(pressed.iter().all(|action| *action == Action::Right));

    // The overlay saw the live tally and the press counters.
    let breakdown = sink.field(OverlayField::VoteBreakdown).expect("breakdown written");
    assert!(breakdown.contains("RIGHT: 2"));
    let total = sink.field(OverlayField::TotalPresses).expect("total written");
    assert!(total.starts_with("Total presses: "));
    let players = sink.field(OverlayField::ActiveParticipants).expect("players written");
    assert_eq!(players, "Active players: 3");

    // Shutdown flushed both the snapshot and the emulator save state.
    let store = SessionStore::new(temp_dir.path(), &resource);
    assert!(store.snapshot_path().exists());
    assert!(store.resume_path().exists());
    assert!(*emulator.saves.lock().expect("saves lock") >= 1);
}

#[test]
fn second_run_resumes_from_first_runs_snapshot() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let resource = PathBuf::from("/roms/adventure.nes");

    let source = Arc::new(FixedSource {
        signals: vec![signal("p1", Reaction::Haha)],
        comments: Vec::new(),
    });

    let first = Controller::new(
        fast_config(temp_dir.path().to_path_buf()),
        Arc::clone(&source) as Arc<dyn SignalSource>,
        Box::new(MemorySink::default()),
        resource.clone(),
    );
    let emulator = Arc::new(FakeEmulator::new(Duration::from_millis(1500)));
    first
        .run(Arc::clone(&emulator) as Arc<dyn Actuator>)
        .expect("first run");

    let store = SessionStore::new(temp_dir.path(), &resource);
    let snapshot = store.restore().expect("restore").expect("snapshot exists");
    assert_eq!(snapshot.past_signals.get("p1"), Some(&Reaction::Haha));

    // A fresh controller against the same resource reloads the save state.
    let second = Controller::new(
        fast_config(temp_dir.path().to_path_buf()),
        source,
        Box::new(MemorySink::default()),
        resource,
    );
    let emulator2 = Arc::new(FakeEmulator::new(Duration::from_millis(500)));
    second
        .run(Arc::clone(&emulator2) as Arc<dyn Actuator>)
        .expect("second run");

    assert_eq!(*emulator2.loads.lock().expect("loads lock"), 1);
}

#[test]
fn unmapped_consensus_presses_nothing() {
    let temp_dir = tempfile::tempdir().expect("temp dir");

    let source = Arc::new(FixedSource {
        signals: vec![
            signal("p1", Reaction::Thankful),
            signal("p2", Reaction::Thankful),
        ],
        comments: Vec::new(),
    });

    let controller = Controller::new(
        fast_config(temp_dir.path().to_path_buf()),
        source,
        Box::new(MemorySink::default()),
        PathBuf::from("/roms/adventure.nes"),
    );
    let emulator = Arc::new(FakeEmulator::new(Duration::from_millis(2500)));
    controller
        .run(Arc::clone(&emulator) as Arc<dyn Actuator>)
        .expect("run");

    assert!(emulator.pressed_actions().is_empty());
}
