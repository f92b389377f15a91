//! Downstream webhook notified after each successful announcement.
//!
//! `POST {url}` with an `X-API-KEY` header. Only `201 Created` counts as delivered.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Institution reported when the address has no known owner.
pub const DEFAULT_INSTITUTION: &str = "Estatal";

/// Header carrying the callback credential.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Errors from the callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Callback body. Field names are fixed by the receiving service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub ip: String,
    pub torrent: String,
    pub fecha_hora: String,
    pub institucion: String,
    pub enlace: String,
    pub enlace_tweet: String,
}

/// Trait for the downstream callback.
pub trait CallbackNotifier: Send + Sync {
    fn notify(&self, payload: &CallbackPayload) -> Result<(), CallbackError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackConfig {
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpCallback {
    config: CallbackConfig,
    client: reqwest::blocking::Client,
}

impl HttpCallback {
    pub fn new(config: CallbackConfig) -> Result<Self, CallbackError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }
}

impl CallbackNotifier for HttpCallback {
    fn notify(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let response = self
            .client
            .post(&self.config.url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(payload)
            .send()?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().unwrap_or_default();
            return Err(CallbackError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Mock callback that records payloads. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockCallback {
    delivered: Arc<RwLock<Vec<CallbackPayload>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    pub fn delivered(&self) -> Vec<CallbackPayload> {
        self.delivered.read().unwrap().clone()
    }
}

impl CallbackNotifier for MockCallback {
    fn notify(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        if *self.fail.read().unwrap() {
            return Err(CallbackError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        self.delivered.write().unwrap().push(payload.clone());
        Ok(())
    }
}
