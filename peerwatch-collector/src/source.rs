//! Upstream peer-history source.
//!
//! Two read-only queries:
//! - `GET {base}/history/peers?cidr=..&key=..` lists peer sightings in a block
//! - `GET {base}/history/peer?ip=..&days=..&contents=..&key=..` lists the content an
//!   address was seen sharing
//!
//! Malformed items in an otherwise valid response are dropped and counted; the
//! caller decides how to report them.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use peerwatch_ranges::Cidr;
use serde::Deserialize;
use thiserror::Error;

/// Name used when a content record carries none.
pub const UNKNOWN_CONTENT_NAME: &str = "Nombre desconocido";

/// Errors from a single source query.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// An address seen in a block, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSighting {
    pub address: Ipv4Addr,
    pub seen_at: DateTime<Utc>,
}

/// One piece of content an address was sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub name: String,
    pub started_at: DateTime<Utc>,
}

/// Items decoded from a response, plus how many were dropped as malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Batch<T> {
    pub fn new(items: Vec<T>, skipped: usize) -> Self {
        Self { items, skipped }
    }
}

/// Query parameters for per-address history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub lookback_days: u32,
    pub max_contents: u32,
}

/// Trait for the upstream source so the cycle can run against canned data.
pub trait ActivitySource: Send + Sync {
    /// Peer sightings reported for `block`.
    fn peers(&self, block: &Cidr) -> Result<Batch<PeerSighting>, SourceError>;

    /// Content records reported for `address`.
    fn history(&self, address: Ipv4Addr, query: &HistoryQuery) -> Result<Batch<ContentRecord>, SourceError>;
}

// ===== Wire format =====

#[derive(Debug, Deserialize)]
struct PeersResponse {
    #[serde(default)]
    peers: Vec<WirePeer>,
}

#[derive(Debug, Deserialize)]
struct WirePeer {
    ip: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    contents: Vec<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    torrent: Option<WireTorrent>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTorrent {
    name: Option<String>,
}

/// Parse a source timestamp. RFC 3339 with any offset; a value without an offset is UTC.
pub fn parse_source_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decode a peers response body.
pub fn parse_peers(body: &str) -> Result<Batch<PeerSighting>, SourceError> {
    let response: PeersResponse = serde_json::from_str(body)?;
    let total = response.peers.len();

    let items: Vec<PeerSighting> = response
        .peers
        .into_iter()
        .filter_map(|peer| {
            let address = peer.ip?.trim().parse::<Ipv4Addr>().ok()?;
            let seen_at = parse_source_time(&peer.date?)?;
            Some(PeerSighting { address, seen_at })
        })
        .collect();

    let skipped = total - items.len();
    Ok(Batch::new(items, skipped))
}

/// Decode a history response body.
pub fn parse_history(body: &str) -> Result<Batch<ContentRecord>, SourceError> {
    let response: HistoryResponse = serde_json::from_str(body)?;
    let total = response.contents.len();

    let items: Vec<ContentRecord> = response
        .contents
        .into_iter()
        .filter_map(|content| {
            let started_at = parse_source_time(content.start_date.as_deref()?)?;
            let name = content
                .torrent
                .and_then(|t| t.name)
                .unwrap_or_else(|| UNKNOWN_CONTENT_NAME.to_string());
            Some(ContentRecord { name, started_at })
        })
        .collect();

    let skipped = total - items.len();
    Ok(Batch::new(items, skipped))
}

// ===== HTTP implementation =====

/// Connection settings for the upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Scheme and host, e.g. `https://api.antitor.com`.
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Source backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpActivitySource {
    config: SourceConfig,
    client: reqwest::blocking::Client,
}

impl HttpActivitySource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("peerwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(query)
            .query(&[("key", self.config.api_key.as_str())])
            .send()?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

impl ActivitySource for HttpActivitySource {
    fn peers(&self, block: &Cidr) -> Result<Batch<PeerSighting>, SourceError> {
        let body = self.get_text("history/peers", &[("cidr", block.to_string())])?;
        parse_peers(&body)
    }

    fn history(&self, address: Ipv4Addr, query: &HistoryQuery) -> Result<Batch<ContentRecord>, SourceError> {
        let body = self.get_text(
            "history/peer",
            &[
                ("ip", address.to_string()),
                ("days", query.lookback_days.to_string()),
                ("contents", query.max_contents.to_string()),
            ],
        )?;
        parse_history(&body)
    }
}

// ===== Test double =====

#[derive(Debug, Clone)]
enum Canned<T> {
    Ok(Batch<T>),
    Fail(u16),
}

impl<T: Clone> Canned<T> {
    fn get(&self) -> Result<Batch<T>, SourceError> {
        match self {
            Canned::Ok(batch) => Ok(batch.clone()),
            Canned::Fail(status) => Err(SourceError::Status(*status)),
        }
    }
}

#[derive(Debug, Default)]
struct MockSourceState {
    peers: HashMap<Cidr, Canned<PeerSighting>>,
    history: HashMap<Ipv4Addr, Canned<ContentRecord>>,
    peer_calls: Vec<Cidr>,
    history_calls: Vec<Ipv4Addr>,
}

/// Mock source with canned responses. Unknown blocks and addresses return empty batches.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockActivitySource {
    state: Arc<RwLock<MockSourceState>>,
}

impl MockActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_peers(&self, block: Cidr, sightings: Vec<PeerSighting>) {
        self.state
            .write()
            .unwrap()
            .peers
            .insert(block, Canned::Ok(Batch::new(sightings, 0)));
    }

    pub fn fail_peers(&self, block: Cidr, status: u16) {
        self.state.write().unwrap().peers.insert(block, Canned::Fail(status));
    }

    pub fn add_history(&self, address: Ipv4Addr, records: Vec<ContentRecord>) {
        self.state
            .write()
            .unwrap()
            .history
            .insert(address, Canned::Ok(Batch::new(records, 0)));
    }

    pub fn fail_history(&self, address: Ipv4Addr, status: u16) {
        self.state.write().unwrap().history.insert(address, Canned::Fail(status));
    }

    /// Blocks queried so far, in call order.
    pub fn peer_calls(&self) -> Vec<Cidr> {
        self.state.read().unwrap().peer_calls.clone()
    }

    /// Addresses queried so far, in call order.
    pub fn history_calls(&self) -> Vec<Ipv4Addr> {
        self.state.read().unwrap().history_calls.clone()
    }
}

impl ActivitySource for MockActivitySource {
    fn peers(&self, block: &Cidr) -> Result<Batch<PeerSighting>, SourceError> {
        let mut state = self.state.write().unwrap();
        state.peer_calls.push(*block);
        match state.peers.get(block) {
            Some(canned) => canned.get(),
            None => Ok(Batch::new(Vec::new(), 0)),
        }
    }

    fn history(&self, address: Ipv4Addr, _query: &HistoryQuery) -> Result<Batch<ContentRecord>, SourceError> {
        let mut state = self.state.write().unwrap();
        state.history_calls.push(address);
        match state.history.get(&address) {
            Some(canned) => canned.get(),
            None => Ok(Batch::new(Vec::new(), 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ===========================================
    // Timestamp parsing
    // ===========================================

    #[test]
    fn test_parse_source_time_zulu() {
        let at = parse_source_time("2024-03-01T10:20:30.000Z").expect("parse");
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_parse_source_time_offset_normalized() {
        let at = parse_source_time("2024-03-01T07:20:30-03:00").expect("parse");
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_parse_source_time_naive_is_utc() {
        let at = parse_source_time("2024-03-01T10:20:30").expect("parse");
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_parse_source_time_rejects_garbage() {
        assert!(parse_source_time("yesterday").is_none());
        assert!(parse_source_time("").is_none());
    }

    // ===========================================
    // Peers decoding
    // ===========================================

    #[test]
    fn test_parse_peers() {
        let body = r#"{"peers":[
            {"ip":"163.247.45.10","date":"2024-03-01T10:00:00Z"},
            {"ip":"163.247.45.11","date":"2024-02-01T10:00:00Z"}
        ]}"#;
        let batch = parse_peers(body).expect("decode");
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.items[0].address, Ipv4Addr::new(163, 247, 45, 10));
    }

    #[test]
    fn test_parse_peers_skips_malformed_items() {
        let body = r#"{"peers":[
            {"ip":"163.247.45.10","date":"2024-03-01T10:00:00Z"},
            {"ip":"163.247.45.11","date":"not a date"},
            {"ip":"2001:db8::1","date":"2024-03-01T10:00:00Z"},
            {"date":"2024-03-01T10:00:00Z"},
            {"ip":"163.247.45.12"}
        ]}"#;
        let batch = parse_peers(body).expect("decode");
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.skipped, 4);
    }

    #[test]
    fn test_parse_peers_missing_list_is_empty() {
        let batch = parse_peers("{}").expect("decode");
        assert!(batch.items.is_empty());
    }

    #[test]
    fn test_parse_peers_invalid_json() {
        assert!(matches!(parse_peers("<html>"), Err(SourceError::Decode(_))));
    }

    // ===========================================
    // History decoding
    // ===========================================

    #[test]
    fn test_parse_history() {
        let body = r#"{"contents":[
            {"torrent":{"name":"ExampleFile"},"startDate":"2024-03-01T10:00:00Z"},
            {"torrent":{},"startDate":"2024-03-02T10:00:00Z"},
            {"startDate":"2024-03-03T10:00:00Z"},
            {"torrent":{"name":"NoDate"}},
            {"torrent":{"name":"EmptyDate"},"startDate":""}
        ]}"#;
        let batch = parse_history(body).expect("decode");

        let names: Vec<&str> = batch.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ExampleFile", UNKNOWN_CONTENT_NAME, UNKNOWN_CONTENT_NAME]);
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn test_parse_history_keeps_order() {
        let body = r#"{"contents":[
            {"torrent":{"name":"B"},"startDate":"2024-03-02T10:00:00Z"},
            {"torrent":{"name":"A"},"startDate":"2024-03-01T10:00:00Z"}
        ]}"#;
        let batch = parse_history(body).expect("decode");
        assert_eq!(batch.items[0].name, "B");
        assert_eq!(batch.items[1].name, "A");
    }

    // ===========================================
    // HTTP client construction
    // ===========================================

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let source = HttpActivitySource::new(SourceConfig {
            base_url: "https://api.example.test/".to_string(),
            api_key: "k".to_string(),
            timeout: Duration::from_secs(1),
        })
        .expect("client");
        assert_eq!(
            source.endpoint("history/peers"),
            "https://api.example.test/history/peers"
        );
    }

    // ===========================================
    // Mock source
    // ===========================================

    #[test]
    fn test_mock_source_canned_and_failures() {
        let source = MockActivitySource::new();
        let block: Cidr = "10.0.0.0/24".parse().unwrap();
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        source.fail_peers(block, 503);

        assert!(matches!(source.peers(&block), Err(SourceError::Status(503))));
        let query = HistoryQuery { lookback_days: 30, max_contents: 100 };
        assert!(source.history(addr, &query).expect("empty").items.is_empty());
        assert_eq!(source.peer_calls(), vec![block]);
        assert_eq!(source.history_calls(), vec![addr]);
    }
}
