//! Signal model: reaction categories, actuator actions, and the raw records
//! produced by a signal source.
//!
//! `Reaction::CANONICAL_ORDER` is the fixed tie-break ordering used by the
//! resolver. It is the declaration order below and must stay stable across
//! releases; resolution results depend on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reaction category expressed by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reaction {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
    Thankful,
}

impl Reaction {
    /// Fixed canonical ordering for deterministic tie-breaks.
    pub const CANONICAL_ORDER: [Reaction; 7] = [
        Reaction::Like,
        Reaction::Love,
        Reaction::Haha,
        Reaction::Wow,
        Reaction::Sad,
        Reaction::Angry,
        Reaction::Thankful,
    ];

    /// Parses the wire name used by the social API.
    /// Unknown names return `None`; callers skip them rather than fail.
    pub fn from_api_name(name: &str) -> Option<Reaction> {
        match name {
            "LIKE" => Some(Reaction::Like),
            "LOVE" => Some(Reaction::Love),
            "HAHA" => Some(Reaction::Haha),
            "WOW" => Some(Reaction::Wow),
            "SAD" => Some(Reaction::Sad),
            "ANGRY" => Some(Reaction::Angry),
            "THANKFUL" => Some(Reaction::Thankful),
            _ => None,
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            Reaction::Like => "LIKE",
            Reaction::Love => "LOVE",
            Reaction::Haha => "HAHA",
            Reaction::Wow => "WOW",
            Reaction::Sad => "SAD",
            Reaction::Angry => "ANGRY",
            Reaction::Thankful => "THANKFUL",
        }
    }
}

/// A discrete input the actuator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::A => "A",
            Action::B => "B",
            Action::Start => "start",
            Action::Select => "select",
        }
    }
}

/// One participant's currently expressed reaction, as observed by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub participant_id: String,
    pub participant_name: String,
    pub reaction: Reaction,
    pub observed_at: DateTime<Utc>,
}

/// A comment from the post's comment feed, ordered by creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
    pub author_name: String,
    pub message: String,
}
