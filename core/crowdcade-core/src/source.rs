//! Seam to the external signal source (the social API adapter).

use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::signals::{Comment, Signal};

/// Supplies the reaction and comment feeds for the controlled post.
///
/// Implementations are pure request/response wrappers; retry and escalation
/// policy belongs to the controller.
pub trait SignalSource: Send + Sync {
    /// Fetches who is currently reacting, with what category, as of now.
    fn fetch_reactions(&self) -> Result<Vec<Signal>, SourceError>;

    /// Fetches comments created strictly after `after`, ordered by creation
    /// time.
    fn fetch_comments(&self, after: DateTime<Utc>) -> Result<Vec<Comment>, SourceError>;
}
