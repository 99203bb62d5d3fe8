//! Lock state machine.
//!
//! Two states, `Closed` and `Opened`, and no transition rules: the
//! controller may commit either state from either state, including the one
//! it is already in (re-running an open on an open door is legal). What the
//! machine adds over a bare [`LockState`] is a bounded transition history
//! and the time spent in the current state, both for diagnostics.
//!
//! # Examples
//!
//! ```
//! use autolock_controller::state_machine::LockStateMachine;
//! use autolock_core::LockState;
//!
//! let mut machine = LockStateMachine::new();
//! assert_eq!(machine.current_state(), LockState::Closed);
//!
//! let transition = machine.commit(LockState::Opened);
//! assert_eq!(transition.from, LockState::Closed);
//! assert_eq!(machine.history().len(), 1);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use autolock_core::LockState;
use tokio::time::Instant;

/// Maximum number of state transitions to keep in history.
///
/// A door sees a few dozen transitions a day; 100 covers several days of
/// normal use at a few kilobytes.
pub const MAX_HISTORY_SIZE: usize = 100;

/// A single committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// State before the commit.
    pub from: LockState,

    /// State after the commit.
    pub to: LockState,

    /// When the commit happened.
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: LockState, to: LockState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Returns `true` if the commit changed the state.
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Time since the commit.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Authoritative lock state with bounded history.
///
/// # Thread Safety
///
/// Not synchronized. The controller keeps it behind its state mutex.
#[derive(Debug)]
pub struct LockStateMachine {
    current_state: LockState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl LockStateMachine {
    /// Create a machine in the `Closed` state with empty history.
    pub fn new() -> Self {
        Self {
            current_state: LockState::Closed,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> LockState {
        self.current_state
    }

    /// Time elapsed since the last state change.
    ///
    /// Re-committing the current state does not restart the clock.
    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).copied().collect()
    }

    /// Commit `state` and record the transition.
    pub fn commit(&mut self, state: LockState) -> StateTransition {
        let transition = StateTransition::new(self.current_state, state);

        if transition.is_change() {
            self.state_entered_at = transition.timestamp;
        }
        self.current_state = state;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        transition
    }
}

impl Default for LockStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
