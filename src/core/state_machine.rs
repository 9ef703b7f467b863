//! State machine for the publication protocol
//!
//! Tracks one publish or revert run. State lives only for the duration of the
//! command; nothing is written to disk.

use crate::core::error::{PublishError, PublishResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Protocol state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Idle,
    Confirmed,
    Cancelled,
    PackageUpserting,
    ArchiveBuilding,
    ReleaseUploading,
    Reverting,
    Published,
    Reverted,
    Failed,
}

impl PublishState {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishState::Cancelled
                | PublishState::Published
                | PublishState::Reverted
                | PublishState::Failed
        )
    }

    fn can_transition_to(&self, to: PublishState) -> bool {
        use PublishState::*;

        matches!(
            (self, to),
            (Idle, Confirmed)
                | (Idle, Cancelled)
                | (Idle, Reverting)
                | (Confirmed, PackageUpserting)
                | (PackageUpserting, ArchiveBuilding)
                | (PackageUpserting, Failed)
                | (ArchiveBuilding, ReleaseUploading)
                | (ArchiveBuilding, Failed)
                | (ReleaseUploading, Published)
                | (ReleaseUploading, Failed)
                | (Reverting, Reverted)
                | (Reverting, Failed)
        )
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: PublishState,
    pub to: PublishState,
    pub timestamp: DateTime<Utc>,
}

/// State machine for one publication run
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Idle,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    ///
    /// Fails with [`PublishError::InvalidTransition`] when the protocol does
    /// not allow moving from the current state to `to`.
    pub fn transition(&mut self, to: PublishState) -> PublishResult<()> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::InvalidTransition {
                from: self.current_state.to_string(),
                to: to.to_string(),
            });
        }

        debug!(from = %self.current_state, to = %to, "state transition");

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;

        Ok(())
    }

    /// Get current state
    pub fn state(&self) -> PublishState {
        self.current_state
    }

    /// Recorded transitions, oldest first
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get elapsed time between first and last transition in milliseconds
    pub fn elapsed_millis(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {} → {}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_machine() {
        let state_machine = PublishStateMachine::new();

        assert_eq!(state_machine.state(), PublishState::Idle);
        assert!(state_machine.transitions().is_empty());
        assert_eq!(state_machine.elapsed_millis(), 0);
    }

    #[test]
    fn test_publish_path() {
        let mut state_machine = PublishStateMachine::new();

        for state in [
            PublishState::Confirmed,
            PublishState::PackageUpserting,
            PublishState::ArchiveBuilding,
            PublishState::ReleaseUploading,
            PublishState::Published,
        ] {
            state_machine.transition(state).unwrap();
        }

        assert_eq!(state_machine.state(), PublishState::Published);
        assert!(state_machine.state().is_terminal());
        assert_eq!(state_machine.transitions().len(), 5);
    }

    #[test]
    fn test_revert_path() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::Reverting).unwrap();
        state_machine.transition(PublishState::Failed).unwrap();

        assert_eq!(state_machine.state(), PublishState::Failed);
    }

    #[test]
    fn test_cannot_skip_confirmation() {
        let mut state_machine = PublishStateMachine::new();

        let err = state_machine
            .transition(PublishState::PackageUpserting)
            .unwrap_err();

        assert!(matches!(err, PublishError::InvalidTransition { .. }));
        assert_eq!(state_machine.state(), PublishState::Idle);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut state_machine = PublishStateMachine::new();
        state_machine.transition(PublishState::Cancelled).unwrap();

        assert!(state_machine.transition(PublishState::Confirmed).is_err());
        assert!(state_machine.transition(PublishState::Reverting).is_err());
    }

    #[test]
    fn test_history() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::Confirmed).unwrap();
        state_machine
            .transition(PublishState::PackageUpserting)
            .unwrap();

        let history = state_machine.history();
        assert!(history.contains("Idle → Confirmed"));
        assert!(history.contains("Confirmed → PackageUpserting"));
    }
}
