//! Duel client module.
//!
//! Connection, matchmaking, countdown, judging and finish handling for one
//! player, composed by [`DuelSession`] and driven by [`run_loop`].

mod client;
mod commands;
mod connection;
mod finish;
mod matchmaking;
mod runner;
mod session;
mod state;
mod timer;
mod transport;

pub use client::{ClientEvent, Intent, run, run_loop};
pub use commands::{Command, HELP, parse_command};
pub use connection::{ConnectionManager, validate_username};
pub use finish::{FinishCoordinator, FinishDisposition, FinishTrigger};
pub use matchmaking::MatchmakingClient;
pub use runner::{CodeRunner, SubmissionResult};
pub use session::{DuelSession, SessionEvent, SubmissionDelivery, SubmissionTicket};
pub use state::{ConnectionState, DuelState, FinishOutcome, Session};
pub use timer::{DuelTimer, TimerEvent, TimerState};
pub use transport::{Transport, TransportEvent};
