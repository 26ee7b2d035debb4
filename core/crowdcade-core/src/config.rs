//! Controller configuration.
//!
//! Everything the controller used to reach for as ambient globals (button
//! tables, intervals, save locations) is an explicit, named parameter here.
//! All fields have defaults so a partial TOML file works.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ControllerError, Result};
use crate::signals::{Action, Reaction};

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_action_interval_secs() -> u64 {
    10
}

fn default_press_duration_ms() -> u64 {
    200
}

fn default_inactivity_cutoff_secs() -> i64 {
    300
}

fn default_persist_interval_secs() -> u64 {
    60
}

fn default_max_consecutive_poll_failures() -> u32 {
    5
}

fn default_save_root() -> PathBuf {
    PathBuf::from("./.saves")
}

/// Finite mapping from reaction category to actuator action.
///
/// Categories absent from the table resolve to no action and are treated
/// identically to "no signal" by the resolver.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ActionMapping {
    table: HashMap<Reaction, Action>,
}

impl ActionMapping {
    pub fn new(table: HashMap<Reaction, Action>) -> Self {
        Self { table }
    }

    pub fn action_for(&self, reaction: Reaction) -> Option<Action> {
        self.table.get(&reaction).copied()
    }
}

impl Default for ActionMapping {
    fn default() -> Self {
        let table = HashMap::from([
            (Reaction::Like, Action::Left),
            (Reaction::Love, Action::Up),
            (Reaction::Haha, Action::Down),
            (Reaction::Wow, Action::Right),
            (Reaction::Sad, Action::B),
            (Reaction::Angry, Action::A),
            // Thankful intentionally unmapped.
        ]);
        Self { table }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between signal-source polls.
    pub poll_interval_secs: u64,
    /// Countdown length, in seconds, between resolved actions.
    pub action_interval_secs: u64,
    /// How long the dispatcher holds a press before releasing.
    pub press_duration_ms: u64,
    /// A participant whose reaction has not changed for this long is
    /// excluded from the active set.
    pub inactivity_cutoff_secs: i64,
    /// Seconds between session snapshots.
    pub persist_interval_secs: u64,
    /// Consecutive poll failures before escalating from warn to error.
    pub max_consecutive_poll_failures: u32,
    /// Root directory for session snapshots and actuator save states.
    pub save_root: PathBuf,
    /// Reaction-to-action table used by the resolver.
    pub actions: ActionMapping,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            action_interval_secs: default_action_interval_secs(),
            press_duration_ms: default_press_duration_ms(),
            inactivity_cutoff_secs: default_inactivity_cutoff_secs(),
            persist_interval_secs: default_persist_interval_secs(),
            max_consecutive_poll_failures: default_max_consecutive_poll_failures(),
            save_root: default_save_root(),
            actions: ActionMapping::default(),
        }
    }
}

impl ControllerConfig {
    /// Load config from a TOML string, falling back to defaults for missing
    /// fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|err| ControllerError::Config(err.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn press_duration(&self) -> Duration {
        Duration::from_millis(self.press_duration_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.persist_interval_secs)
    }

    pub fn inactivity_cutoff(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.inactivity_cutoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let config = ControllerConfig::default();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.action_interval_secs, 10);
        assert_eq!(config.press_duration_ms, 200);
        assert_eq!(config.persist_interval_secs, 60);
    }

    #[test]
    fn default_mapping_matches_original_layout() {
        let mapping = ActionMapping::default();
        assert_eq!(mapping.action_for(Reaction::Like), Some(Action::Left));
        assert_eq!(mapping.action_for(Reaction::Love), Some(Action::Up));
        assert_eq!(mapping.action_for(Reaction::Haha), Some(Action::Down));
        assert_eq!(mapping.action_for(Reaction::Wow), Some(Action::Right));
        assert_eq!(mapping.action_for(Reaction::Sad), Some(Action::B));
        assert_eq!(mapping.action_for(Reaction::Angry), Some(Action::A));
        assert_eq!(mapping.action_for(Reaction::Thankful), None);
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let config = ControllerConfig::from_toml("poll_interval_secs = 5\n").expect("parse toml");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.action_interval_secs, 10);
        assert_eq!(config.actions, ActionMapping::default());
    }

    #[test]
    fn invalid_toml_reports_config_error() {
        let result = ControllerConfig::from_toml("poll_interval_secs = \"soon\"");
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[test]
    fn mapping_overridable_from_toml() {
        let toml_str = r#"
[actions]
LIKE = "a"
LOVE = "start"
"#;
        let config = ControllerConfig::from_toml(toml_str).expect("parse toml");
        assert_eq!(config.actions.action_for(Reaction::Like), Some(Action::A));
        assert_eq!(config.actions.action_for(Reaction::Love), Some(Action::Start));
        assert_eq!(config.actions.action_for(Reaction::Haha), None);
    }
}
