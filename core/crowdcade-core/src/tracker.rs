//! Participant activity tracking.
//!
//! Activity means *recent change of opinion*, not recent presence: a
//! participant's last-changed timestamp moves only when their reaction
//! category differs from what we last stored for them. Entries are never
//! deleted; the table is the lifetime history of reactors.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::signals::{Reaction, Signal};

/// Current-signals map plus the per-participant last-changed record.
///
/// Owned exclusively by the controller; other components see cloned
/// snapshots, never the live maps.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    current: HashMap<String, Reaction>,
    last_changed: HashMap<String, DateTime<Utc>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a tracker from persisted state.
    pub fn from_parts(
        current: HashMap<String, Reaction>,
        last_changed: HashMap<String, DateTime<Utc>>,
    ) -> Self {
        Self {
            current,
            last_changed,
        }
    }

    /// Applies one poll's worth of signals.
    ///
    /// First-time appearance counts as a change. Re-observing the same
    /// category leaves the last-changed timestamp untouched.
    pub fn ingest(&mut self, signals: &[Signal], now: DateTime<Utc>) {
        for signal in signals {
            let changed = self
                .current
                .get(&signal.participant_id)
                .map(|previous| *previous != signal.reaction)
                .unwrap_or(true);

            if changed {
                self.current
                    .insert(signal.participant_id.clone(), signal.reaction);
                self.last_changed.insert(signal.participant_id.clone(), now);
            }
        }
    }

    /// Participants whose reaction changed within the cutoff window.
    /// Pure function of the last-changed record and `now`.
    pub fn active_participants(
        &self,
        now: DateTime<Utc>,
        cutoff: chrono::Duration,
    ) -> HashSet<String> {
        self.last_changed
            .iter()
            .filter(|(_, changed_at)| now - **changed_at <= cutoff)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Folds the current signals of the given active set into a tally.
    pub fn tally(&self, active: &HashSet<String>) -> HashMap<Reaction, usize> {
        let mut counts = HashMap::new();
        for (participant, reaction) in &self.current {
            if active.contains(participant) {
                *counts.entry(*reaction).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn tracked_participants(&self) -> usize {
        self.last_changed.len()
    }

    pub fn current_signals(&self) -> &HashMap<String, Reaction> {
        &self.current
    }

    pub fn last_changed(&self) -> &HashMap<String, DateTime<Utc>> {
        &self.last_changed
    }
}
