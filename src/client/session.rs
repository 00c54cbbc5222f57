//! The duel session state machine.
//!
//! [`DuelSession`] composes the connection, matchmaking, timer and finish
//! components and is the only thing that mutates them. It performs no I/O:
//! commands leave through the transport channel held by the
//! [`ConnectionManager`], everything else is reported as [`SessionEvent`]s
//! for the runtime to act on.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DuelError;
use crate::models::Problem;
use crate::protocol::{DUEL_DURATION_SECS, MessageKind, RunRequest, ServerMessage};

use super::connection::ConnectionManager;
use super::finish::{FinishCoordinator, FinishDisposition, FinishTrigger};
use super::matchmaking::MatchmakingClient;
use super::runner::{CodeRunner, SubmissionResult};
use super::state::{ConnectionState, DuelState, FinishOutcome, Session};
use super::timer::{DuelTimer, TimerEvent, TimerState};

/// Something the rendering layer or the runtime needs to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected { username: String },
    Status(String),
    Echo(String),
    Matched(Problem),
    Tick { remaining: u32 },
    Expired,
    FinishSent { opponent: String, trigger: FinishTrigger },
    /// The runtime should `POST /finish` for this timed-out duel.
    TimeoutAcknowledgement { username: String, opponent: String },
    Outcome(FinishOutcome),
    Disconnected { reason: String },
}

/// A validated submission waiting for the judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub id: Uuid,
    pub problem_generation: u64,
    pub request: RunRequest,
}

/// A finished submission, labelled against the problem now active.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionDelivery {
    /// Result for the problem still being played.
    Current(SubmissionResult),
    /// Result for a problem that has since been replaced or cleared.
    Stale { slug: String, result: SubmissionResult },
}

type Handler = fn(&mut DuelSession, ServerMessage) -> Vec<SessionEvent>;

struct Route {
    kind: MessageKind,
    accepts: fn(DuelState) -> bool,
    handler: Handler,
}

fn any_connected(state: DuelState) -> bool {
    state != DuelState::Disconnected
}

fn in_duel(state: DuelState) -> bool {
    state.in_duel()
}

/// Server message dispatch table.
///
/// - `status`: any connected state. Surfaces the message.
/// - `echo`: any connected state. Surfaces the message.
/// - `problem`: any connected state. Replaces the problem, restarts the
///   timer at [`DUEL_DURATION_SECS`], clears `finish_sent`, enters `Matched`.
/// - `result`: `Matched` or `Finished`. Cancels the timer, clears the
///   problem and `finish_sent`, returns to `Connected`.
static ROUTES: [Route; 4] = [
    Route {
        kind: MessageKind::Status,
        accepts: any_connected,
        handler: DuelSession::on_status,
    },
    Route {
        kind: MessageKind::Echo,
        accepts: any_connected,
        handler: DuelSession::on_echo,
    },
    Route {
        kind: MessageKind::Problem,
        accepts: any_connected,
        handler: DuelSession::on_problem,
    },
    Route {
        kind: MessageKind::Result,
        accepts: in_duel,
        handler: DuelSession::on_result,
    },
];

#[derive(Debug)]
pub struct DuelSession {
    connection: ConnectionManager,
    matchmaking: MatchmakingClient,
    timer: DuelTimer,
    finish: FinishCoordinator,
    duel: DuelState,
    in_flight: Option<Uuid>,
}

impl DuelSession {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            connection: ConnectionManager::new(server_url),
            matchmaking: MatchmakingClient::new(),
            timer: DuelTimer::new(),
            finish: FinishCoordinator::new(),
            duel: DuelState::Disconnected,
            in_flight: None,
        }
    }

    /// The live session, if a connection is open or being opened.
    pub fn session(&self) -> Option<Session> {
        if !matches!(
            self.connection.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return None;
        }
        Some(Session {
            username: self.connection.username().unwrap_or_default().to_string(),
            opponent: self.matchmaking.opponent().map(str::to_string),
            connection: self.connection.state(),
            duel: self.duel,
        })
    }

    pub fn duel_state(&self) -> DuelState {
        self.duel
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.matchmaking.problem()
    }

    pub fn timer(&self) -> TimerState {
        self.timer.state()
    }

    pub fn timer_epoch(&self) -> u64 {
        self.timer.epoch()
    }

    pub fn finish_sent(&self) -> bool {
        self.finish.finish_sent()
    }

    pub fn submission_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a connection for `username` and return the URL to open.
    ///
    /// Every connect starts from a clean duel: nothing from a previous
    /// session survives.
    pub fn connect(&mut self, username: &str) -> Result<String, DuelError> {
        if matches!(
            self.connection.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Err(DuelError::InvalidState {
                action: "connect",
                state: self.duel,
            });
        }
        let url = self.connection.connect(username)?;
        self.tear_down();
        Ok(url)
    }

    /// The transport handshake completed.
    pub fn on_transport_open(&mut self, outgoing: mpsc::UnboundedSender<String>) -> Vec<SessionEvent> {
        if !self.connection.on_open(outgoing) {
            return Vec::new();
        }
        self.tear_down();
        self.duel = DuelState::Connected;
        let username = self.connection.username().unwrap_or_default().to_string();
        vec![SessionEvent::Connected { username }]
    }

    /// The transport closed or failed to open.
    pub fn on_transport_closed(&mut self, reason: &str) -> Vec<SessionEvent> {
        if !matches!(
            self.connection.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Vec::new();
        }
        self.connection.on_closed(reason);
        self.tear_down();
        vec![SessionEvent::Disconnected {
            reason: DuelError::Connection(reason.to_string()).to_string(),
        }]
    }

    /// Close the connection. No-op when not connected.
    pub fn disconnect(&mut self) -> Vec<SessionEvent> {
        if !matches!(
            self.connection.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Vec::new();
        }
        self.connection.disconnect();
        self.tear_down();
        vec![SessionEvent::Disconnected {
            reason: "disconnected by user".to_string(),
        }]
    }

    /// Enter the matchmaking queue.
    ///
    /// A [`DuelError::Connection`] means the transport is gone; the session is
    /// already torn down when it is returned.
    pub fn join_queue(&mut self) -> Result<(), DuelError> {
        if let Err(e) = self.matchmaking.join_queue(self.duel, &mut self.connection) {
            self.on_send_error(&e);
            return Err(e);
        }
        self.duel = DuelState::Searching;
        Ok(())
    }

    /// Finish this side of the duel. Safe to call repeatedly.
    ///
    /// Send failures tear the session down as in [`DuelSession::join_queue`].
    pub fn finish(&mut self) -> Result<Vec<SessionEvent>, DuelError> {
        self.finish_with(FinishTrigger::Manual).inspect_err(|e| {
            self.on_send_error(e);
        })
    }

    /// Advance the countdown by one second. Expiry takes the `finish` path.
    pub fn on_tick(&mut self) -> Vec<SessionEvent> {
        match self.timer.tick() {
            None => Vec::new(),
            Some(TimerEvent::Tick { remaining }) => vec![SessionEvent::Tick { remaining }],
            Some(TimerEvent::Expired) => {
                info!("duel timer expired");
                let mut events = vec![SessionEvent::Expired];
                match self.finish_with(FinishTrigger::Timer) {
                    Ok(more) => events.extend(more),
                    Err(e) => {
                        warn!(error = %e, "automatic finish rejected");
                        events.extend(self.on_send_error(&e));
                    }
                }
                events
            }
        }
    }

    /// Decode and dispatch one text frame from the server.
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub fn handle_frame(&mut self, frame: &str) -> Vec<SessionEvent> {
        match self.connection.decode(frame) {
            Ok(message) => self.dispatch(message),
            Err(e) => {
                warn!(error = %e, %frame, "dropping server frame");
                Vec::new()
            }
        }
    }

    pub fn dispatch(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        let kind = message.kind();
        let Some(route) = ROUTES.iter().find(|route| route.kind == kind) else {
            warn!(?kind, "no handler registered");
            return Vec::new();
        };
        if !(route.accepts)(self.duel) {
            warn!(?kind, state = %self.duel, "ignoring message in this state");
            return Vec::new();
        }
        debug!(?kind, "dispatching");
        (route.handler)(self, message)
    }

    /// Validate a submission and reserve the single in-flight slot.
    pub fn submit(&mut self, code: &str, language: &str, slug: &str) -> Result<SubmissionTicket, DuelError> {
        if self.in_flight.is_some() {
            return Err(DuelError::SubmissionInFlight);
        }
        let request = CodeRunner::prepare(code, language, slug)?;
        let id = Uuid::new_v4();
        self.in_flight = Some(id);
        debug!(%id, slug = %request.slug, "submission started");

        Ok(SubmissionTicket {
            id,
            problem_generation: self.matchmaking.generation(),
            request,
        })
    }

    /// Release the in-flight slot and label the result.
    pub fn complete_submission(&mut self, ticket: SubmissionTicket, result: SubmissionResult) -> SubmissionDelivery {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
        }

        let current = self.matchmaking.problem().is_some()
            && ticket.problem_generation == self.matchmaking.generation();
        if current {
            SubmissionDelivery::Current(result)
        } else {
            warn!(id = %ticket.id, slug = %ticket.request.slug, "discarding result for a previous problem");
            SubmissionDelivery::Stale {
                slug: ticket.request.slug,
                result,
            }
        }
    }

    fn finish_with(&mut self, trigger: FinishTrigger) -> Result<Vec<SessionEvent>, DuelError> {
        let disposition =
            self.finish
                .finish(trigger, self.duel, self.matchmaking.opponent(), &mut self.connection)?;

        let FinishDisposition::Sent { opponent } = disposition else {
            return Ok(Vec::new());
        };
        self.duel = DuelState::Finished;

        let mut events = vec![SessionEvent::FinishSent {
            opponent: opponent.clone(),
            trigger,
        }];
        if trigger == FinishTrigger::Timer {
            events.push(SessionEvent::TimeoutAcknowledgement {
                username: self.connection.username().unwrap_or_default().to_string(),
                opponent,
            });
        }
        Ok(events)
    }

    /// A send into a stopped writer counts as losing the transport.
    fn on_send_error(&mut self, error: &DuelError) -> Vec<SessionEvent> {
        match error {
            DuelError::Connection(reason) => self.on_transport_closed(reason),
            _ => Vec::new(),
        }
    }

    fn tear_down(&mut self) {
        self.timer.cancel();
        self.finish.reset();
        self.matchmaking.clear();
        self.in_flight = None;
        self.duel = DuelState::Disconnected;
    }

    fn on_status(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        match message {
            ServerMessage::Status { message } => vec![SessionEvent::Status(message)],
            _ => Vec::new(),
        }
    }

    fn on_echo(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        match message {
            ServerMessage::Echo { message } => vec![SessionEvent::Echo(message)],
            _ => Vec::new(),
        }
    }

    fn on_problem(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        let ServerMessage::Problem(problem) = message else {
            return Vec::new();
        };
        if self.duel.in_duel() {
            info!(state = %self.duel, "new problem replaces the active duel");
        }

        self.finish.reset();
        self.timer.start(DUEL_DURATION_SECS);
        let problem = self.matchmaking.assign(problem).clone();
        self.duel = DuelState::Matched;
        vec![SessionEvent::Matched(problem)]
    }

    fn on_result(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        let ServerMessage::Result { message } = message else {
            return Vec::new();
        };
        let outcome = self.finish.on_result(&mut self.timer, message);
        self.matchmaking.clear();
        self.duel = DuelState::Connected;
        vec![SessionEvent::Outcome(outcome)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    const PROBLEM: &str = r#"{
        "type": "problem",
        "slug": "two-sum",
        "title": "Two Sum",
        "difficulty": "Easy",
        "tags": ["Array"],
        "link": "https://leetcode.com/problems/two-sum/",
        "description": "<p>...</p>",
        "opponent": "bob"
    }"#;

    fn connected(name: &str) -> (DuelSession, mpsc::UnboundedReceiver<String>) {
        let mut session = DuelSession::new("ws://127.0.0.1:8000/ws");
        session.connect(name).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let events = session.on_transport_open(tx);
        assert_eq!(
            events,
            vec![SessionEvent::Connected {
                username: name.to_string()
            }]
        );
        (session, rx)
    }

    fn matched() -> (DuelSession, mpsc::UnboundedReceiver<String>) {
        let (mut session, mut rx) = connected("alice");
        session.join_queue().unwrap();
        assert_eq!(rx.try_recv().unwrap(), "join");
        session.handle_frame(PROBLEM);
        (session, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_join_before_connect_is_rejected() {
        let mut session = DuelSession::new("ws://x");
        assert!(matches!(
            session.join_queue(),
            Err(DuelError::InvalidState { .. })
        ));
        assert_eq!(session.duel_state(), DuelState::Disconnected);
        assert!(session.session().is_none());
    }

    #[test]
    fn test_join_while_connecting_sends_nothing() {
        let mut session = DuelSession::new("ws://x");
        session.connect("alice").unwrap();
        assert!(matches!(
            session.join_queue(),
            Err(DuelError::InvalidState { .. })
        ));
        let snapshot = session.session().unwrap();
        assert_eq!(snapshot.connection, ConnectionState::Connecting);
        assert_eq!(snapshot.duel, DuelState::Disconnected);
    }

    #[test]
    fn test_connect_rejects_empty_username() {
        let mut session = DuelSession::new("ws://x");
        assert!(matches!(
            session.connect("  "),
            Err(DuelError::InvalidInput(_))
        ));
        assert_eq!(session.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let (mut session, _rx) = connected("alice");
        assert!(matches!(
            session.connect("alice"),
            Err(DuelError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_join_twice_is_rejected() {
        let (mut session, mut rx) = connected("alice");
        session.join_queue().unwrap();
        assert_eq!(session.duel_state(), DuelState::Searching);

        assert!(session.join_queue().is_err());
        assert_eq!(drain(&mut rx), vec!["join"]);
    }

    #[test]
    fn test_join_while_matched_is_rejected() {
        let (mut session, mut rx) = matched();
        assert!(matches!(
            session.join_queue(),
            Err(DuelError::InvalidState { .. })
        ));
        assert_eq!(session.duel_state(), DuelState::Matched);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_status_message_does_not_change_state() {
        let (mut session, _rx) = connected("alice");
        session.join_queue().unwrap();
        let events = session.handle_frame(r#"{"type":"status","message":"Waiting for opponent..."}"#);
        assert_eq!(
            events,
            vec![SessionEvent::Status("Waiting for opponent...".to_string())]
        );
        assert_eq!(session.duel_state(), DuelState::Searching);
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let (mut session, _rx) = connected("alice");
        assert!(session.handle_frame("{not json").is_empty());
        assert!(session.handle_frame(r#"{"type":"mystery"}"#).is_empty());
        assert_eq!(session.connection_state(), ConnectionState::Connected);
        assert_eq!(session.duel_state(), DuelState::Connected);
    }

    #[test]
    fn test_result_outside_duel_is_ignored() {
        let (mut session, _rx) = connected("alice");
        assert!(session.handle_frame(r#"{"type":"result","message":"?"}"#).is_empty());
        assert_eq!(session.duel_state(), DuelState::Connected);
    }

    #[test]
    fn test_problem_assignment() {
        let (session, _rx) = matched();
        assert_eq!(session.duel_state(), DuelState::Matched);
        assert_eq!(session.session().unwrap().opponent.as_deref(), Some("bob"));
        assert_eq!(session.problem().unwrap().slug, "two-sum");
        assert_eq!(
            session.timer(),
            TimerState {
                remaining_seconds: DUEL_DURATION_SECS,
                running: true
            }
        );
    }

    #[test]
    fn test_new_problem_resets_duel() {
        let (mut session, mut rx) = matched();
        for _ in 0..42 {
            session.on_tick();
        }
        session.finish().unwrap();
        assert!(session.finish_sent());
        let epoch = session.timer_epoch();

        let replacement = PROBLEM.replace("two-sum", "add-two-numbers").replace("bob", "carol");
        let events = session.handle_frame(&replacement);

        assert!(matches!(events.as_slice(), [SessionEvent::Matched(p)] if p.slug == "add-two-numbers"));
        assert_eq!(session.duel_state(), DuelState::Matched);
        assert_eq!(session.timer().remaining_seconds, DUEL_DURATION_SECS);
        assert_ne!(session.timer_epoch(), epoch);
        assert!(!session.finish_sent());

        session.finish().unwrap();
        assert_eq!(drain(&mut rx), vec!["finish:bob", "finish:carol"]);
    }

    #[test]
    fn test_finish_without_opponent_is_rejected() {
        let (mut session, mut rx) = connected("alice");
        session.join_queue().unwrap();
        drain(&mut rx);
        let anonymous = PROBLEM.replace(r#""opponent": "bob""#, r#""opponent": null"#);
        session.handle_frame(&anonymous);

        assert!(matches!(
            session.finish(),
            Err(DuelError::InvalidState { .. })
        ));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_finish_before_match_is_rejected() {
        let (mut session, mut rx) = connected("alice");
        assert!(session.finish().is_err());
        session.join_queue().unwrap();
        assert!(session.finish().is_err());
        assert_eq!(drain(&mut rx), vec!["join"]);
    }

    #[test]
    fn test_finish_race_sends_exactly_once() {
        let ticks = DUEL_DURATION_SECS as usize + 20;
        for finish_at in [Some(0), Some(300), Some(599), Some(600), Some(610), None] {
            let (mut session, mut rx) = matched();
            let mut acknowledgements = 0;

            for i in 0..ticks {
                if Some(i) == finish_at {
                    session.finish().unwrap();
                    session.finish().unwrap();
                }
                for event in session.on_tick() {
                    if matches!(event, SessionEvent::TimeoutAcknowledgement { .. }) {
                        acknowledgements += 1;
                    }
                }
            }
            session.finish().unwrap();

            assert_eq!(drain(&mut rx), vec!["finish:bob"], "finish_at={:?}", finish_at);
            let manual_first = finish_at.is_some_and(|i| i < DUEL_DURATION_SECS as usize);
            assert_eq!(acknowledgements, if manual_first { 0 } else { 1 });
            assert_eq!(session.duel_state(), DuelState::Finished);
        }
    }

    #[test]
    fn test_timer_expiry_finishes_automatically() {
        let (mut session, mut rx) = matched();
        let mut events = Vec::new();
        for _ in 0..DUEL_DURATION_SECS {
            events.extend(session.on_tick());
        }

        assert_eq!(events.last(), Some(&SessionEvent::TimeoutAcknowledgement {
            username: "alice".to_string(),
            opponent: "bob".to_string(),
        }));
        assert!(events.contains(&SessionEvent::Expired));
        assert!(events.contains(&SessionEvent::FinishSent {
            opponent: "bob".to_string(),
            trigger: FinishTrigger::Timer,
        }));
        assert_eq!(drain(&mut rx), vec!["finish:bob"]);
        assert!(session.on_tick().is_empty());
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let (mut session, mut rx) = matched();
        session.finish().unwrap();
        let events = session.disconnect();

        assert!(matches!(events.as_slice(), [SessionEvent::Disconnected { .. }]));
        assert_eq!(session.duel_state(), DuelState::Disconnected);
        assert!(!session.timer().running);
        assert!(!session.finish_sent());
        assert!(session.problem().is_none());
        assert!(session.session().is_none());
        assert!(session.disconnect().is_empty());

        drain(&mut rx);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    fn assert_torn_down(session: &DuelSession) {
        assert_eq!(session.duel_state(), DuelState::Disconnected);
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert!(!session.timer().running);
        assert!(!session.finish_sent());
        assert!(session.problem().is_none());
        assert!(session.session().is_none());
    }

    #[test]
    fn test_manual_finish_into_dead_writer_disconnects() {
        let (mut session, rx) = matched();
        drop(rx);

        assert!(matches!(session.finish(), Err(DuelError::Connection(_))));
        assert_torn_down(&session);
        assert!(matches!(session.finish(), Err(DuelError::InvalidState { .. })));

        session.connect("alice").unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!session.on_transport_open(tx).is_empty());
        assert_eq!(session.duel_state(), DuelState::Connected);
    }

    #[test]
    fn test_expiry_into_dead_writer_disconnects() {
        let (mut session, rx) = matched();
        drop(rx);

        let mut events = Vec::new();
        for _ in 0..DUEL_DURATION_SECS {
            events.extend(session.on_tick());
        }

        let tail = &events[events.len() - 2..];
        assert_eq!(tail[0], SessionEvent::Expired);
        assert!(matches!(&tail[1], SessionEvent::Disconnected { reason } if reason.contains("writer")));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::TimeoutAcknowledgement { .. })));
        assert_torn_down(&session);
    }

    #[test]
    fn test_join_into_dead_writer_disconnects() {
        let (mut session, rx) = connected("alice");
        drop(rx);

        assert!(matches!(session.join_queue(), Err(DuelError::Connection(_))));
        assert_torn_down(&session);
        assert!(matches!(session.join_queue(), Err(DuelError::InvalidState { .. })));
    }

    #[test]
    fn test_connection_loss_then_reconnect_starts_clean() {
        let (mut session, _rx) = matched();
        session.finish().unwrap();
        let events = session.on_transport_closed("reset by peer");
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Disconnected { reason }] if reason.contains("reset by peer")
        ));
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert_eq!(session.finish().unwrap_err(), DuelError::InvalidState {
            action: "finish",
            state: DuelState::Disconnected,
        });

        session.connect("alice").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.on_transport_open(tx);
        assert_eq!(session.duel_state(), DuelState::Connected);
        assert!(!session.finish_sent());
        assert!(!session.timer().running);
        assert!(session.problem().is_none());

        session.join_queue().unwrap();
        assert_eq!(drain(&mut rx), vec!["join"]);
    }

    #[test]
    fn test_submission_is_serialized() {
        let (mut session, _rx) = matched();
        let ticket = session.submit("print(1)", "python", "two-sum").unwrap();
        assert!(session.submission_in_flight());
        assert_eq!(
            session.submit("print(2)", "python", "two-sum"),
            Err(DuelError::SubmissionInFlight)
        );

        session.complete_submission(ticket, SubmissionResult::AllPassed);
        assert!(!session.submission_in_flight());
        assert!(session.submit("print(2)", "python", "two-sum").is_ok());
    }

    #[test]
    fn test_invalid_submission_does_not_reserve_slot() {
        let (mut session, _rx) = matched();
        assert!(matches!(
            session.submit("print(1)", "cobol", "two-sum"),
            Err(DuelError::InvalidInput(_))
        ));
        assert!(!session.submission_in_flight());
    }

    #[test]
    fn test_stale_submission_is_relabelled() {
        let (mut session, _rx) = matched();
        let ticket = session.submit("print(1)", "python", "two-sum").unwrap();

        session.handle_frame(&PROBLEM.replace("two-sum", "three-sum"));
        let delivery = session.complete_submission(ticket, SubmissionResult::AllPassed);

        assert_eq!(
            delivery,
            SubmissionDelivery::Stale {
                slug: "two-sum".to_string(),
                result: SubmissionResult::AllPassed,
            }
        );
    }

    #[test]
    fn test_end_to_end_duel() {
        let mut session = DuelSession::new("ws://127.0.0.1:8000/ws");
        let url = session.connect("alice").unwrap();
        assert_eq!(url, "ws://127.0.0.1:8000/ws/alice");
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.on_transport_open(tx);

        session.join_queue().unwrap();
        session.handle_frame(PROBLEM);
        let snapshot = session.session().unwrap();
        assert_eq!(snapshot.duel, DuelState::Matched);
        assert_eq!(snapshot.opponent.as_deref(), Some("bob"));
        assert_eq!(session.timer().remaining_seconds, 600);

        let ticket = session.submit("def solve(): pass", "python", "two-sum").unwrap();
        assert_eq!(
            session.complete_submission(ticket, SubmissionResult::AllPassed),
            SubmissionDelivery::Current(SubmissionResult::AllPassed)
        );

        session.finish().unwrap();
        session.finish().unwrap();
        assert_eq!(drain(&mut rx), vec!["join", "finish:bob"]);

        let events = session.handle_frame(r#"{"type":"result","message":"alice wins"}"#);
        assert_eq!(
            events,
            vec![SessionEvent::Outcome(FinishOutcome {
                message: "alice wins".to_string()
            })]
        );
        assert_eq!(session.duel_state(), DuelState::Connected);
        assert!(!session.timer().running);
        assert!(session.problem().is_none());
        assert!(session.session().unwrap().opponent.is_none());

        // Ready for another round.
        session.join_queue().unwrap();
        assert_eq!(drain(&mut rx), vec!["join"]);
    }
}
