//! Matchmaking: queue entry and problem assignment.

use tracing::info;

use crate::error::DuelError;
use crate::models::Problem;
use crate::protocol::ClientCommand;

use super::connection::ConnectionManager;
use super::state::DuelState;

/// Holds the active problem and the opponent it came with.
#[derive(Debug, Default)]
pub struct MatchmakingClient {
    problem: Option<Problem>,
    generation: u64,
}

impl MatchmakingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    pub fn opponent(&self) -> Option<&str> {
        self.problem.as_ref().and_then(|p| p.opponent.as_deref())
    }

    /// Changes every time the active problem is replaced or cleared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send the join command. Requires `Connected` and no active problem.
    pub fn join_queue(&self, state: DuelState, conn: &mut ConnectionManager) -> Result<(), DuelError> {
        if state != DuelState::Connected || self.problem.is_some() {
            return Err(DuelError::InvalidState {
                action: "join the queue",
                state,
            });
        }
        conn.send(&ClientCommand::Join)?;
        info!("joined matchmaking queue");
        Ok(())
    }

    /// Replace the active problem wholesale.
    pub fn assign(&mut self, problem: Problem) -> &Problem {
        info!(
            slug = %problem.slug,
            opponent = problem.opponent.as_deref().unwrap_or("<unknown>"),
            "matched"
        );
        self.generation += 1;
        self.problem.insert(problem)
    }

    pub fn clear(&mut self) {
        if self.problem.take().is_some() {
            self.generation += 1;
        }
    }
}
