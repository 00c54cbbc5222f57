//! Finish handshake.
//!
//! Manual finish and timer expiry both call [`FinishCoordinator::finish`];
//! the `finish_sent` flag it guards is the only thing deciding whether a
//! finish command goes out.

use tracing::{debug, info};

use crate::error::DuelError;
use crate::protocol::ClientCommand;

use super::connection::ConnectionManager;
use super::state::{DuelState, FinishOutcome};
use super::timer::DuelTimer;

/// Who asked for the finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishTrigger {
    Manual,
    Timer,
}

/// Effect of a successful `finish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishDisposition {
    /// The finish command was sent to the transport.
    Sent { opponent: String },
    /// A finish was already sent for this duel; nothing happened.
    AlreadySent,
}

#[derive(Debug, Default)]
pub struct FinishCoordinator {
    finish_sent: bool,
}

impl FinishCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish_sent(&self) -> bool {
        self.finish_sent
    }

    /// Send the finish command once per duel.
    ///
    /// Requires `Matched` and a known opponent unless a finish was already
    /// sent, in which case it succeeds without sending.
    pub fn finish(
        &mut self,
        trigger: FinishTrigger,
        state: DuelState,
        opponent: Option<&str>,
        conn: &mut ConnectionManager,
    ) -> Result<FinishDisposition, DuelError> {
        if self.finish_sent {
            debug!(?trigger, "finish already sent");
            return Ok(FinishDisposition::AlreadySent);
        }

        let invalid = DuelError::InvalidState {
            action: "finish",
            state,
        };
        if state != DuelState::Matched {
            return Err(invalid);
        }
        let opponent = opponent.ok_or(invalid)?;

        conn.send(&ClientCommand::Finish {
            opponent: opponent.to_string(),
        })?;
        self.finish_sent = true;
        info!(?trigger, %opponent, "finish sent");

        Ok(FinishDisposition::Sent {
            opponent: opponent.to_string(),
        })
    }

    /// Handle the server's result announcement.
    pub fn on_result(&mut self, timer: &mut DuelTimer, message: String) -> FinishOutcome {
        timer.cancel();
        self.finish_sent = false;
        info!(%message, "duel result");
        FinishOutcome { message }
    }

    pub fn reset(&mut self) {
        self.finish_sent = false;
    }
}
