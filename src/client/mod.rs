//! Remote memory service client
//!
//! Thin HTTP clients for the remote service's agent and message endpoints.
//! Two flavors with identical surfaces: [`AsyncRecallClient`] (tokio) and
//! [`RecallClient`] (blocking, for synchronous call trees).
//!
//! # Authentication
//!
//! The bearer token is read from `RECALL_API_KEY` at call time, never cached
//! at construction. An absent token sends no Authorization header; the
//! service decides whether anonymous calls are acceptable.

pub mod agents;
pub mod messages;
pub mod types;

pub use types::{AgentState, CapturePayload, CreateAgentRequest};

use std::env;
use std::time::Duration;

use crate::core::RecallResult;

/// Default base URL of the remote memory service
pub const DEFAULT_BASE_URL: &str = "https://api.recall.dev";

/// Environment variable holding the bearer token
pub const API_KEY_ENV: &str = "RECALL_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "RECALL_BASE_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read the bearer token from the environment, at call time.
pub(crate) fn bearer_token() -> Option<String> {
    env::var(API_KEY_ENV).ok().filter(|t| !t.is_empty())
}

fn base_url_from_env() -> String {
    env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Async client for the remote memory service
pub struct AsyncRecallClient {
    pub(crate) http: reqwest::Client,
    base_url: String,
}

impl AsyncRecallClient {
    /// Create a client against a specific base URL
    pub fn new(base_url: impl Into<String>) -> RecallResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Create a client from the environment (`RECALL_BASE_URL`, default
    /// otherwise)
    pub fn from_env() -> RecallResult<Self> {
        Self::new(base_url_from_env())
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for AsyncRecallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRecallClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Blocking client for the remote memory service.
///
/// Must not be constructed or used from inside a tokio runtime; that is what
/// [`AsyncRecallClient`] is for.
pub struct RecallClient {
    pub(crate) http: reqwest::blocking::Client,
    base_url: String,
}

impl RecallClient {
    /// Create a client against a specific base URL
    pub fn new(base_url: impl Into<String>) -> RecallResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Create a client from the environment (`RECALL_BASE_URL`, default
    /// otherwise)
    pub fn from_env() -> RecallResult<Self> {
        Self::new(base_url_from_env())
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for RecallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecallClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
