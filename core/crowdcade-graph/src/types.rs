//! Wire types for the Graph API feeds, plus conversion into the core signal
//! model.
//!
//! Decoding is strict about shape (a reaction without an `id` is a malformed
//! payload) but lenient about vocabulary: a reaction whose `type` we do not
//! recognize is skipped with a debug log, since the platform adds categories
//! without notice.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crowdcade_core::error::SourceError;
use crowdcade_core::signals::{Comment, Reaction, Signal};

/// The timestamp format the Graph API uses, e.g. `2017-02-18T21:34:58+0000`.
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// One page of a paginated feed.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn next_url(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|paging| paging.next.as_deref())
    }
}

/// One entry of the reactions feed.
#[derive(Debug, Deserialize)]
pub struct ReactionEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of the comments feed.
#[derive(Debug, Deserialize)]
pub struct CommentEntry {
    pub id: String,
    pub created_time: String,
    pub from: CommentAuthor,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub name: String,
}

pub fn parse_created_time(raw: &str) -> Result<DateTime<Utc>, SourceError> {
    DateTime::parse_from_str(raw, GRAPH_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| SourceError::Format(format!("bad created_time {raw:?}: {err}")))
}

/// Converts one page of reaction entries into signals, dropping entries with
/// unknown reaction kinds.
pub fn signals_from_entries(entries: Vec<ReactionEntry>, observed_at: DateTime<Utc>) -> Vec<Signal> {
    entries
        .into_iter()
        .filter_map(|entry| match Reaction::from_api_name(&entry.kind) {
            Some(reaction) => Some(Signal {
                participant_id: entry.id,
                participant_name: entry.name,
                reaction,
                observed_at,
            }),
            None => {
                debug!(kind = %entry.kind, participant = %entry.id, "Skipping unknown reaction kind");
                None
            }
        })
        .collect()
}

pub fn comment_from_entry(entry: CommentEntry) -> Result<Comment, SourceError> {
    Ok(Comment {
        created_at: parse_created_time(&entry.created_time)?,
        id: entry.id,
        author_id: entry.from.id,
        author_name: entry.from.name,
        message: entry.message,
    })
}
