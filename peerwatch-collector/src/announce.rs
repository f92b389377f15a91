//! Public announcement channel.
//!
//! `POST {url}` with `{"text": ...}` and a bearer token. A 2xx response carries
//! `{"data":{"id": ...}}`; the id is the announcement's reference.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from publishing an announcement.
#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A 2xx arrived but its body could not be read or decoded. The announcement
    /// is probably public even though no reference came back.
    #[error("accepted with status {status} but the response was unreadable: {reason}")]
    Unconfirmed { status: u16, reason: String },
}

impl AnnounceError {
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, AnnounceError::Unconfirmed { .. })
    }
}

/// Trait for the announcement channel.
pub trait Announcer: Send + Sync {
    /// Publish `text`, returning the channel's reference id.
    fn announce(&self, text: &str) -> Result<String, AnnounceError>;
}

#[derive(Debug, Serialize)]
struct AnnounceRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnnounceResponse {
    data: AnnounceData,
}

#[derive(Debug, Deserialize)]
struct AnnounceData {
    id: String,
}

/// Extract the reference id from a success body.
pub fn parse_announce_response(body: &str) -> Result<String, AnnounceError> {
    let response: AnnounceResponse = serde_json::from_str(body)?;
    Ok(response.data.id)
}

/// Reference id from a 2xx response whose body may not have been readable.
pub fn confirm_accepted<E: std::fmt::Display>(
    status: u16,
    body: Result<String, E>,
) -> Result<String, AnnounceError> {
    let unconfirmed = |reason: String| AnnounceError::Unconfirmed { status, reason };
    let body = body.map_err(|e| unconfirmed(e.to_string()))?;
    parse_announce_response(&body).map_err(|e| unconfirmed(e.to_string()))
}

/// Settings for the HTTP announcer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceConfig {
    pub url: String,
    pub token: String,
    /// Base of public announcement links; the reference id is appended.
    pub permalink_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpAnnouncer {
    config: AnnounceConfig,
    client: reqwest::blocking::Client,
}

impl HttpAnnouncer {
    pub fn new(config: AnnounceConfig) -> Result<Self, AnnounceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("peerwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }
}

impl Announcer for HttpAnnouncer {
    fn announce(&self, text: &str) -> Result<String, AnnounceError> {
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(&AnnounceRequest { text })
            .send()?;

        let status = response.status();
        let body = response.text();
        if !status.is_success() {
            return Err(AnnounceError::Rejected {
                status: status.as_u16(),
                body: body.unwrap_or_default(),
            });
        }
        confirm_accepted(status.as_u16(), body)
    }
}

#[derive(Debug, Default)]
struct MockAnnouncerState {
    published: Vec<String>,
    failures_left: usize,
    unconfirmed_left: usize,
    fail_all: bool,
    next_id: u64,
}

/// Mock announcer that records published texts and hands out sequential ids.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockAnnouncer {
    state: Arc<RwLock<MockAnnouncerState>>,
}

impl MockAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` announcements.
    pub fn fail_next(&self, count: usize) {
        self.state.write().unwrap().failures_left = count;
    }

    /// Publish the next `count` announcements but answer as if the response was lost.
    pub fn unconfirm_next(&self, count: usize) {
        self.state.write().unwrap().unconfirmed_left = count;
    }

    /// Reject every announcement until turned off.
    pub fn fail_all(&self, fail: bool) {
        self.state.write().unwrap().fail_all = fail;
    }

    /// Texts accepted so far.
    pub fn published(&self) -> Vec<String> {
        self.state.read().unwrap().published.clone()
    }

    pub fn count(&self) -> usize {
        self.state.read().unwrap().published.len()
    }
}

impl Announcer for MockAnnouncer {
    fn announce(&self, text: &str) -> Result<String, AnnounceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_all || state.failures_left > 0 {
            state.failures_left = state.failures_left.saturating_sub(1);
            return Err(AnnounceError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        state.next_id += 1;
        state.published.push(text.to_string());
        if state.unconfirmed_left > 0 {
            state.unconfirmed_left -= 1;
            return Err(AnnounceError::Unconfirmed {
                status: 201,
                reason: "connection closed mid-body".to_string(),
            });
        }
        Ok(format!("{}", 1000 + state.next_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_announce_response() {
        let id = parse_announce_response(r#"{"data":{"id":"1790000000000000001","text":"hi"}}"#)
            .expect("parse");
        assert_eq!(id, "1790000000000000001");
    }

    #[test]
    fn test_parse_announce_response_missing_id() {
        assert!(matches!(
            parse_announce_response(r#"{"data":{}}"#),
            Err(AnnounceError::Decode(_))
        ));
    }

    #[test]
    fn test_confirm_accepted_unreadable_body_is_unconfirmed() {
        let lost: Result<String, &str> = Err("connection reset");
        let err = confirm_accepted(201, lost).unwrap_err();
        assert!(err.is_unconfirmed());
        assert_eq!(
            err.to_string(),
            "accepted with status 201 but the response was unreadable: connection reset"
        );

        let garbled: Result<String, &str> = Ok("<html>".to_string());
        assert!(confirm_accepted(200, garbled).unwrap_err().is_unconfirmed());
    }

    #[test]
    fn test_confirm_accepted_returns_id() {
        let body: Result<String, &str> = Ok(r#"{"data":{"id":"42"}}"#.to_string());
        assert_eq!(confirm_accepted(201, body).unwrap(), "42");
    }

    #[test]
    fn test_mock_announcer_unconfirmed_still_publishes() {
        let announcer = MockAnnouncer::new();
        announcer.unconfirm_next(1);
        assert!(announcer.announce("lost").unwrap_err().is_unconfirmed());
        assert_eq!(announcer.announce("next").unwrap(), "1002");
        assert_eq!(announcer.count(), 2);
    }

    #[test]
    fn test_request_body_shape() {
        let json = serde_json::to_string(&AnnounceRequest { text: "a\nb" }).unwrap();
        assert_eq!(json, r#"{"text":"a\nb"}"#);
    }

    #[test]
    fn test_mock_announcer_ids_and_failures() {
        let announcer = MockAnnouncer::new();
        assert_eq!(announcer.announce("one").unwrap(), "1001");

        announcer.fail_next(1);
        assert!(announcer.announce("two").is_err());
        assert_eq!(announcer.announce("three").unwrap(), "1002");

        assert_eq!(announcer.published(), vec!["one", "three"]);
    }

    #[test]
    fn test_mock_announcer_fail_all() {
        let announcer = MockAnnouncer::new();
        announcer.fail_all(true);
        assert!(announcer.announce("x").is_err());
        assert!(announcer.announce("y").is_err());
        assert_eq!(announcer.count(), 0);
    }

    #[test]
    fn test_announce_error_display() {
        let err = AnnounceError::Rejected {
            status: 429,
            body: "Too Many Requests".to_string(),
        };
        assert_eq!(err.to_string(), "rejected with status 429: Too Many Requests");
    }
}
