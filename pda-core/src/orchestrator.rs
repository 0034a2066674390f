//! The Orchestrator state machine: validated lifecycle types shared between
//! the core protocol and the concrete driver in `pda-runtime`.

use serde::{Deserialize, Serialize};

use crate::error::OrchError;

/// One state of an Orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrchestratorState {
    Idle,
    PreFlight,
    Running,
    AwaitingUser,
    Success,
    Error,
}

impl OrchestratorState {
    /// Whether this state permits `reset()` back to `Idle`.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrchestratorState::Success | OrchestratorState::Error)
    }
}

/// Validate a proposed transition against the fixed state graph. No other
/// transitions are legal:
///
/// ```text
/// IDLE          -> PRE_FLIGHT
/// PRE_FLIGHT    -> RUNNING | ERROR
/// RUNNING       -> AWAITING_USER | SUCCESS | ERROR
/// AWAITING_USER -> RUNNING | ERROR
/// SUCCESS       -> IDLE (via reset)
/// ERROR         -> IDLE (via reset)
/// ```
pub fn validate_transition(from: OrchestratorState, to: OrchestratorState) -> Result<(), OrchError> {
    use OrchestratorState::*;
    let legal = matches!(
        (from, to),
        (Idle, PreFlight)
            | (PreFlight, Running)
            | (PreFlight, Error)
            | (Running, AwaitingUser)
            | (Running, Success)
            | (Running, Error)
            | (AwaitingUser, Running)
            | (AwaitingUser, Error)
            | (Success, Idle)
            | (Error, Idle)
    );
    if legal {
        Ok(())
    } else {
        Err(OrchError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrchestratorState::*;

    #[test]
    fn legal_transitions_are_accepted() {
        assert!(validate_transition(Idle, PreFlight).is_ok());
        assert!(validate_transition(PreFlight, Running).is_ok());
        assert!(validate_transition(PreFlight, Error).is_ok());
        assert!(validate_transition(Running, AwaitingUser).is_ok());
        assert!(validate_transition(Running, Success).is_ok());
        assert!(validate_transition(Running, Error).is_ok());
        assert!(validate_transition(AwaitingUser, Running).is_ok());
        assert!(validate_transition(AwaitingUser, Error).is_ok());
        assert!(validate_transition(Success, Idle).is_ok());
        assert!(validate_transition(Error, Idle).is_ok());
    }

    #[test]
    fn illegal_transitions_name_from_and_to() {
        let err = validate_transition(Idle, Running).unwrap_err();
        match err {
            OrchError::IllegalTransition { from, to } => {
                assert_eq!(from, Idle);
                assert_eq!(to, Running);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn terminal_states_permit_reset() {
        assert!(Success.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Running.is_terminal());
        assert!(!Idle.is_terminal());
    }
}
