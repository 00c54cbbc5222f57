//! Transport lifecycle and raw frame handling.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::DuelError;
use crate::protocol::{ClientCommand, ServerMessage};

use super::state::ConnectionState;

/// Owns the connection state and the outgoing half of the transport.
///
/// The actual socket lives in [`super::transport`]; this type only holds the
/// channel feeding its writer task, so it can be driven without any I/O.
#[derive(Debug)]
pub struct ConnectionManager {
    base_url: String,
    state: ConnectionState,
    username: Option<String>,
    outgoing: Option<mpsc::UnboundedSender<String>>,
}

impl ConnectionManager {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: ConnectionState::Idle,
            username: None,
            outgoing: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Begin a connection for `username` and return the URL to open.
    ///
    /// The caller must already know the manager is not connecting or
    /// connected; the session checks that before calling.
    pub fn connect(&mut self, username: &str) -> Result<String, DuelError> {
        let username = validate_username(username)?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), username);

        self.outgoing = None;
        self.username = Some(username.to_string());
        self.state = ConnectionState::Connecting;
        info!(%url, "connecting");
        Ok(url)
    }

    /// Attach the writer channel of a freshly opened transport.
    ///
    /// Returns `false` (and drops the channel) when no connection attempt is
    /// pending, e.g. the user disconnected while the handshake was running.
    pub fn on_open(&mut self, outgoing: mpsc::UnboundedSender<String>) -> bool {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "ignoring transport opened outside of a connection attempt");
            return false;
        }
        self.outgoing = Some(outgoing);
        self.state = ConnectionState::Connected;
        info!(username = self.username.as_deref().unwrap_or_default(), "connected");
        true
    }

    /// Close the transport if open. No-op otherwise.
    pub fn disconnect(&mut self) {
        if matches!(self.state, ConnectionState::Idle | ConnectionState::Closed) {
            return;
        }
        // Dropping the sender ends the writer task, which closes the socket.
        self.outgoing = None;
        self.state = ConnectionState::Closed;
        info!("disconnected");
    }

    /// Record that the transport went away underneath us.
    pub fn on_closed(&mut self, reason: &str) {
        if self.state == ConnectionState::Closed {
            return;
        }
        warn!(%reason, "connection closed");
        self.outgoing = None;
        self.state = ConnectionState::Closed;
    }

    /// Encode and queue `command` on the transport.
    pub fn send(&mut self, command: &ClientCommand) -> Result<(), DuelError> {
        if self.state != ConnectionState::Connected {
            return Err(DuelError::NotConnected);
        }
        let sender = self.outgoing.as_ref().ok_or(DuelError::NotConnected)?;
        let frame = command.to_wire();
        debug!(%frame, "sending");
        sender
            .send(frame)
            .map_err(|_| DuelError::Connection("transport writer has stopped".to_string()))
    }

    /// Parse an incoming text frame.
    pub fn decode(&self, frame: &str) -> Result<ServerMessage, DuelError> {
        serde_json::from_str(frame).map_err(|e| DuelError::MalformedMessage(e.to_string()))
    }
}

/// Validate a username for use as a URL path segment. Returns the trimmed name.
pub fn validate_username(username: &str) -> Result<&str, DuelError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(DuelError::InvalidInput("username must not be empty".to_string()));
    }

    // The name goes into the URL unescaped, so only unreserved characters pass.
    if let Some(c) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
    {
        return Err(DuelError::InvalidInput(format!(
            "username {:?} contains {:?}; use letters, digits, '-', '_', '.' or '~'",
            trimmed, c
        )));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> (ConnectionManager, mpsc::UnboundedReceiver<String>) {
        let mut conn = ConnectionManager::new("ws://localhost:8000/ws/");
        conn.connect("alice").unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(conn.on_open(tx));
        (conn, rx)
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  alice ").unwrap(), "alice");
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("a/b").is_err());
        assert!(validate_username("a b").is_err());
        assert!(validate_username("a%2Fb").is_err());
        assert!(validate_username("a?x=1").is_err());
        assert!(validate_username("bob#1").is_err());
        assert!(validate_username("émile").is_err());
        assert_eq!(validate_username("al.ice_-~9").unwrap(), "al.ice_-~9");
    }

    #[test]
    fn test_connect_builds_url_and_transitions() {
        let mut conn = ConnectionManager::new("ws://localhost:8000/ws/");
        assert_eq!(conn.state(), ConnectionState::Idle);

        let url = conn.connect("alice").unwrap();
        assert_eq!(url, "ws://localhost:8000/ws/alice");
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert_eq!(conn.username(), Some("alice"));
    }

    #[test]
    fn test_empty_username_leaves_state_unchanged() {
        let mut conn = ConnectionManager::new("ws://x");
        assert!(matches!(conn.connect(""), Err(DuelError::InvalidInput(_))));
        assert_eq!(conn.state(), ConnectionState::Idle);
        assert!(conn.username().is_none());
    }

    #[test]
    fn test_send_requires_connected() {
        let mut conn = ConnectionManager::new("ws://x");
        assert_eq!(conn.send(&ClientCommand::Join), Err(DuelError::NotConnected));

        conn.connect("alice").unwrap();
        assert_eq!(conn.send(&ClientCommand::Join), Err(DuelError::NotConnected));
    }

    #[test]
    fn test_send_queues_wire_frame() {
        let (mut conn, mut rx) = connected();
        conn.send(&ClientCommand::Join).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "join");
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut conn, mut rx) = connected();
        conn.disconnect();
        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.send(&ClientCommand::Join), Err(DuelError::NotConnected));
        // Writer channel was dropped.
        assert_eq!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected));
    }

    #[test]
    fn test_stale_open_is_ignored() {
        let (mut conn, _rx) = connected();
        conn.disconnect();
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(!conn.on_open(tx));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_decode_malformed_frame() {
        let (conn, _rx) = connected();
        assert!(matches!(
            conn.decode("not json"),
            Err(DuelError::MalformedMessage(_))
        ));
        assert!(conn.decode(r#"{"type":"status","message":"hi"}"#).is_ok());
    }
}
