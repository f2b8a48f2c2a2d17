//! Two-phase timed operations without blocking.
//!
//! Physical operations that take real time (a probe conversion, an opto
//! pulse) are split into a start and a finish, with a delay between them.
//! Each runs as a [`PhasedOperation`] polled from the run loop:
//!
//! ```text
//!            poll → Start                 delay elapsed
//!   ┌──────┐ ─────────────▶ ┌─────────┐ ───────────────▶ ┌────────────────────┐
//!   │ Idle │                │ Started │                  │ AwaitingCompletion │
//!   └──────┘ ◀───────────────────────────────────────── └────────────────────┘
//!                               poll → Finish
//! ```
//!
//! The caller performs the physical work for whichever [`Phase`] `poll`
//! returns.  Because the operation never leaves `Started` before its delay
//! has passed, a second start can never overlap a running one.

/// Work the caller must do now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Begin the physical operation.
    Start,
    /// Read back / finalise it.
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Idle,
    Started { at_ms: u64 },
    AwaitingCompletion,
}

#[derive(Debug, Clone)]
pub struct PhasedOperation {
    state: PhaseState,
    delay_ms: u64,
}

impl PhasedOperation {
    pub fn new(delay_ms: u64) -> Self {
        Self { state: PhaseState::Idle, delay_ms }
    }

    #[cfg(test)]
    fn state(&self) -> PhaseState {
        self.state
    }

    /// Advance the machine by one tick.
    pub fn poll(&mut self, now_ms: u64) -> Option<Phase> {
        match self.state {
            PhaseState::Idle => {
                self.state = PhaseState::Started { at_ms: now_ms };
                Some(Phase::Start)
            }
            PhaseState::Started { at_ms } => {
                if now_ms.saturating_sub(at_ms) >= self.delay_ms {
                    self.state = PhaseState::AwaitingCompletion;
                }
                None
            }
            PhaseState::AwaitingCompletion => {
                self.state = PhaseState::Idle;
                Some(Phase::Finish)
            }
        }
    }
}
