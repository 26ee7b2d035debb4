//! Blocking Graph API client.
//!
//! One client per controlled live video. The reactions feed is read as a
//! single large page (the tally only needs who is reacting right now); the
//! comments feed follows `paging.next` links, capped so a hostile or broken
//! feed cannot pin the poll thread forever.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crowdcade_core::error::SourceError;
use crowdcade_core::signals::{Comment, Signal};
use crowdcade_core::source::SignalSource;

use crate::types::{comment_from_entry, signals_from_entries, CommentEntry, Page, ReactionEntry};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v2.8";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_LIMIT: u32 = 500;
const MAX_COMMENT_PAGES: usize = 25;

pub struct GraphClient {
    http: Client,
    base_url: String,
    object_id: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(object_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_base_url(object_id, access_token, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root. Tests use this to talk to a
    /// local stub server.
    pub fn with_base_url(
        object_id: impl Into<String>,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            object_id: object_id.into(),
            access_token: access_token.into(),
        })
    }

    fn feed_url(&self, feed: &str) -> String {
        format!(
            "{}/{}/{}?access_token={}&limit={}",
            self.base_url, self.object_id, feed, self.access_token, PAGE_LIMIT
        )
    }

    fn get_page<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Page<T>, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::Transport(format!(
                "request failed with status {status}: {body}"
            )));
        }

        response
            .json::<Page<T>>()
            .map_err(|err| SourceError::Format(err.to_string()))
    }

    /// Follows `paging.next` links until the feed is exhausted or the page
    /// cap is reached.
    fn get_all_pages<T: serde::de::DeserializeOwned>(
        &self,
        first_url: &str,
    ) -> Result<Vec<T>, SourceError> {
        let mut entries = Vec::new();
        let mut url = first_url.to_string();

        for page_index in 0..MAX_COMMENT_PAGES {
            let page: Page<T> = self.get_page(&url)?;
            let next = page.next_url().map(String::from);
            entries.extend(page.data);

            match next {
                Some(next) => url = next,
                None => return Ok(entries),
            }

            if page_index + 1 == MAX_COMMENT_PAGES {
                warn!(pages = MAX_COMMENT_PAGES, "Comment feed pagination cap reached");
            }
        }

        Ok(entries)
    }
}

impl SignalSource for GraphClient {
    fn fetch_reactions(&self) -> Result<Vec<Signal>, SourceError> {
        let page: Page<ReactionEntry> = self.get_page(&self.feed_url("reactions"))?;
        let signals = signals_from_entries(page.data, Utc::now());
        debug!(count = signals.len(), "Fetched reactions");
        Ok(signals)
    }

    fn fetch_comments(&self, after: DateTime<Utc>) -> Result<Vec<Comment>, SourceError> {
        let entries: Vec<CommentEntry> = self.get_all_pages(&self.feed_url("comments"))?;

        let mut comments = entries
            .into_iter()
            .map(comment_from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        comments.retain(|comment| comment.created_at > after);
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        debug!(count = comments.len(), "Fetched comments");
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_carries_token_and_limit() {
        let client = GraphClient::with_base_url("12345", "secret-token", "https://example.test/v2.8/")
            .expect("client");

        assert_eq!(
            client.feed_url("reactions"),
            "https://example.test/v2.8/12345/reactions?access_token=secret-token&limit=500"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let a = GraphClient::with_base_url("1", "t", "https://example.test/v2.8").expect("client");
        let b = GraphClient::with_base_url("1", "t", "https://example.test/v2.8/").expect("client");
        assert_eq!(a.feed_url("comments"), b.feed_url("comments"));
    }
}
