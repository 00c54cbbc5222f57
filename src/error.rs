//! Error types for the duel client.

use thiserror::Error;

use crate::client::DuelState;

/// Errors surfaced by the session core.
///
/// Every variant except [`DuelError::Connection`] is local and recoverable:
/// the operation was rejected and the session is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DuelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not connected to the duel server")]
    NotConnected,
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: DuelState,
    },
    #[error("malformed server message: {0}")]
    MalformedMessage(String),
    #[error("connection lost: {0}")]
    Connection(String),
    #[error("a submission is already running")]
    SubmissionInFlight,
}

/// Errors emitted by the HTTP side of `CodeRunner`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    #[error("judge request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("judge returned an unreadable body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors emitted while opening the WebSocket transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
