//! Client configuration.

use std::env;
use std::time::Duration;

use crate::protocol::{DEFAULT_JUDGE_URL, DEFAULT_SERVER_URL};

/// HTTP request timeout used when nothing else is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket base URL; the username is appended as a path segment.
    pub server_url: String,
    /// Base URL of the execution service.
    pub judge_url: String,
    /// Timeout for each judge request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            judge_url: DEFAULT_JUDGE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `DUEL_SERVER_URL`, `DUEL_JUDGE_URL` and
    /// `DUEL_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DUEL_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(url) = non_empty("DUEL_JUDGE_URL") {
            config.judge_url = url;
        }
        if let Some(secs) = non_empty("DUEL_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}
