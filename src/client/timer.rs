//! Duel countdown.
//!
//! The timer holds no clock of its own: the runtime calls [`DuelTimer::tick`]
//! once per second while [`DuelTimer::is_running`] is true, and restarts its
//! interval whenever [`DuelTimer::epoch`] changes.

/// Snapshot of the countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub running: bool,
}

/// What a single tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown advanced and is still running.
    Tick { remaining: u32 },
    /// Countdown reached zero. Emitted once per `start`.
    Expired,
}

/// A single countdown per session.
#[derive(Debug, Default)]
pub struct DuelTimer {
    state: TimerState,
    epoch: u64,
}

impl DuelTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Incremented by every `start`, so ticks scheduled for an earlier
    /// countdown can be told apart from ticks for the current one.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a fresh countdown, replacing any existing one.
    pub fn start(&mut self, duration_seconds: u32) {
        self.cancel();
        self.epoch += 1;
        self.state = TimerState {
            remaining_seconds: duration_seconds,
            running: true,
        };
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&mut self) {
        self.state.running = false;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` once stopped, so `Expired` cannot repeat even if the
    /// runtime keeps ticking.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.state.running {
            return None;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.state.running = false;
            return Some(TimerEvent::Expired);
        }
        Some(TimerEvent::Tick {
            remaining: self.state.remaining_seconds,
        })
    }
}
