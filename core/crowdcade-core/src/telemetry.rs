//! Telemetry publishing for the broadcaster overlay.
//!
//! The broadcaster reads a handful of text files, one logical field each, and
//! re-renders them on its own schedule. We only ever overwrite whole files:
//! writes are idempotent and last-write-wins, with no ordering guarantee
//! between fields.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::ActionMapping;
use crate::dispatch::DispatchStats;
use crate::error::OverlayError;
use crate::signals::{Action, Reaction};

const VOTE_COUNT_WIDTH: usize = 5;

/// The named overlay fields the broadcaster knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayField {
    Countdown,
    VoteBreakdown,
    RecentPresses,
    TotalPresses,
    Uptime,
    ActiveParticipants,
}

impl OverlayField {
    pub fn file_name(&self) -> &'static str {
        match self {
            OverlayField::Countdown => "next-press-countdown.txt",
            OverlayField::VoteBreakdown => "vote-breakdown.txt",
            OverlayField::RecentPresses => "most-recent-presses.txt",
            OverlayField::TotalPresses => "total-presses.txt",
            OverlayField::Uptime => "total-uptime.txt",
            OverlayField::ActiveParticipants => "active-participants.txt",
        }
    }

    pub const ALL: [OverlayField; 6] = [
        OverlayField::Countdown,
        OverlayField::VoteBreakdown,
        OverlayField::RecentPresses,
        OverlayField::TotalPresses,
        OverlayField::Uptime,
        OverlayField::ActiveParticipants,
    ];
}

/// A sink for named text fields. The file-backed implementation is the
/// production path; tests substitute an in-memory sink.
pub trait OverlaySink: Send + Sync {
    fn write_field(&self, field: OverlayField, text: &str) -> Result<(), OverlayError>;
}

/// Writes each field to `<root>/<field file name>`.
#[derive(Debug, Clone)]
pub struct FileOverlaySink {
    root: PathBuf,
}

impl FileOverlaySink {
    pub fn new(root: PathBuf) -> Result<Self, OverlayError> {
        fs_err::create_dir_all(&root).map_err(|err| OverlayError::Io {
            context: format!("creating overlay directory {}", root.display()),
            source: err,
        })?;
        Ok(Self { root })
    }

    pub fn field_path(&self, field: OverlayField) -> PathBuf {
        self.root.join(field.file_name())
    }
}

impl OverlaySink for FileOverlaySink {
    fn write_field(&self, field: OverlayField, text: &str) -> Result<(), OverlayError> {
        let path = self.field_path(field);
        fs_err::write(&path, text).map_err(|err| OverlayError::Io {
            context: format!("writing overlay field {}", path.display()),
            source: err,
        })
    }
}

fn pad_count(count: usize) -> String {
    format!("{:<width$}", count, width = VOTE_COUNT_WIDTH)
}

fn pad_time(value: i64) -> String {
    format!("{:02}", value)
}

pub fn render_countdown(seconds_remaining: u64) -> String {
    format!("Next button press in: {} seconds", seconds_remaining)
}

/// Vote counts keyed by the button they would press, in the fixed layout the
/// overlay scene expects.
pub fn render_vote_breakdown(
    tally: &HashMap<Reaction, usize>,
    mapping: &ActionMapping,
) -> String {
    let mut by_action: HashMap<Action, usize> = HashMap::new();
    for (reaction, count) in tally {
        if let Some(action) = mapping.action_for(*reaction) {
            *by_action.entry(action).or_insert(0) += count;
        }
    }
    let count = |action: Action| pad_count(by_action.get(&action).copied().unwrap_or(0));

    format!(
        "Current votes:\n\n  UP: {}  DOWN: {}\nLEFT: {} RIGHT: {}\n   B: {}     A: {}\n",
        count(Action::Up),
        count(Action::Down),
        count(Action::Left),
        count(Action::Right),
        count(Action::B),
        count(Action::A),
    )
}

pub fn render_recent_presses(recent: &[Action]) -> String {
    let joined = recent
        .iter()
        .map(|action| action.label().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Most recent presses:\n{}", joined)
}

pub fn render_total_presses(total: u64) -> String {
    format!("Total presses: {}", total)
}

pub fn render_uptime(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - started_at).max(chrono::Duration::zero());
    let total_seconds = elapsed.num_seconds();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    format!(
        "Total uptime: {}D, {}H, {}M, {}S",
        days,
        pad_time(hours),
        pad_time(minutes),
        pad_time(seconds),
    )
}

pub fn render_active_participants(count: usize) -> String {
    format!("Active players: {}", count)
}

/// Ties the render functions to a sink. Stateless apart from the sink handle;
/// calling any publish twice with the same input writes identical bytes.
pub struct TelemetryPublisher {
    sink: Box<dyn OverlaySink>,
}

impl TelemetryPublisher {
    pub fn new(sink: Box<dyn OverlaySink>) -> Self {
        Self { sink }
    }

    pub fn publish_countdown(&self, seconds_remaining: u64) -> Result<(), OverlayError> {
        self.sink
            .write_field(OverlayField::Countdown, &render_countdown(seconds_remaining))
    }

    pub fn publish_vote_breakdown(
        &self,
        tally: &HashMap<Reaction, usize>,
        mapping: &ActionMapping,
    ) -> Result<(), OverlayError> {
        self.sink.write_field(
            OverlayField::VoteBreakdown,
            &render_vote_breakdown(tally, mapping),
        )
    }

    pub fn publish_dispatch_stats(&self, stats: &DispatchStats) -> Result<(), OverlayError> {
        self.sink.write_field(
            OverlayField::RecentPresses,
            &render_recent_presses(&stats.recent),
        )?;
        self.sink.write_field(
            OverlayField::TotalPresses,
            &render_total_presses(stats.total_presses),
        )
    }

    pub fn publish_uptime(
        &self,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), OverlayError> {
        self.sink
            .write_field(OverlayField::Uptime, &render_uptime(started_at, now))
    }

    pub fn publish_active_participants(&self, count: usize) -> Result<(), OverlayError> {
        self.sink.write_field(
            OverlayField::ActiveParticipants,
            &render_active_participants(count),
        )
    }

    /// Writes every field's zero state so the overlay never shows stale or
    /// missing text at startup.
    pub fn publish_defaults(
        &self,
        started_at: DateTime<Utc>,
        mapping: &ActionMapping,
    ) -> Result<(), OverlayError> {
        self.publish_countdown(0)?;
        self.publish_vote_breakdown(&HashMap::new(), mapping)?;
        self.publish_dispatch_stats(&DispatchStats::default())?;
        self.publish_uptime(started_at, started_at)?;
        self.publish_active_participants(0)
    }
}
