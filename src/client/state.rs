//! Client state management.

use std::fmt;

/// Lifecycle of the WebSocket transport.
///
/// `Closed` is reachable from every state; leaving it requires a fresh
/// `connect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport has been requested yet.
    #[default]
    Idle,
    /// Transport requested, handshake not yet complete.
    Connecting,
    /// Transport open; commands may be sent.
    Connected,
    /// Transport closed, either explicitly or by error.
    Closed,
}

/// Current state of the duel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuelState {
    /// No open connection.
    #[default]
    Disconnected,
    /// Connected and idle, ready to join the queue.
    Connected,
    /// Waiting in the matchmaking queue.
    Searching,
    /// Paired with an opponent, problem active.
    Matched,
    /// Finish sent, waiting for the server to announce the outcome.
    Finished,
}

impl DuelState {
    /// Whether a problem is being played (or awaiting its result).
    pub fn in_duel(self) -> bool {
        matches!(self, Self::Matched | Self::Finished)
    }
}

impl fmt::Display for DuelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Searching => "searching for an opponent",
            Self::Matched => "in a duel",
            Self::Finished => "waiting for the duel result",
        };
        f.write_str(name)
    }
}

/// Read-only view of the session handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub opponent: Option<String>,
    pub connection: ConnectionState,
    pub duel: DuelState,
}

/// Announcement of the duel winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    pub message: String,
}
