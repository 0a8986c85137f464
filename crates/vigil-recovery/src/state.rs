//! Recovery state machine
//!
//! ```text
//! Uninitialized -> ArmDelay -> Armed -> Triggered -> Recovering -> Armed
//!                                          |
//!                                          +-> Armed (reset failed)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Recovery handler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecoveryState {
    /// Handler not started
    #[default]
    Uninitialized,
    /// Started; errors ignored until the arm delay elapses
    ArmDelay,
    /// Listening for matching errors
    Armed,
    /// Matching error seen; content being reset
    Triggered,
    /// Navigating to the default view
    Recovering,
}

impl Display for RecoveryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: RecoveryState,
        /// Requested state
        to: RecoveryState,
    },
}

/// Validates a state transition.
///
/// # Errors
/// Returns `StateMachineError::IllegalTransition` if `to` is not reachable
/// from `from` in one step.
pub fn validate_transition(from: RecoveryState, to: RecoveryState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RecoveryState) -> Vec<RecoveryState> {
    use RecoveryState::{ArmDelay, Armed, Recovering, Triggered, Uninitialized};
    match from {
        Uninitialized => vec![ArmDelay],
        ArmDelay => vec![Armed],
        Armed => vec![Triggered],
        Triggered => vec![Recovering, Armed],
        Recovering => vec![Armed],
    }
}

fn allowed(from: RecoveryState, to: RecoveryState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = RecoveryState> {
        prop_oneof![
            Just(RecoveryState::Uninitialized),
            Just(RecoveryState::ArmDelay),
            Just(RecoveryState::Armed),
            Just(RecoveryState::Triggered),
            Just(RecoveryState::Recovering),
        ]
    }

    #[test]
    fn happy_path_is_allowed() {
        use RecoveryState::*;
        let path = [Uninitialized, ArmDelay, Armed, Triggered, Recovering, Armed];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn cannot_skip_arm_delay() {
        assert_eq!(
            validate_transition(RecoveryState::Uninitialized, RecoveryState::Armed),
            Err(StateMachineError::IllegalTransition {
                from: RecoveryState::Uninitialized,
                to: RecoveryState::Armed,
            })
        );
    }

    proptest! {
        #[test]
        fn validate_agrees_with_table(from in any_state(), to in any_state()) {
            let listed = allowed_transitions(from).contains(&to);
            prop_assert_eq!(validate_transition(from, to).is_ok(), listed);
        }

        #[test]
        fn nothing_returns_to_uninitialized(from in any_state()) {
            prop_assert!(!allowed_transitions(from).contains(&RecoveryState::Uninitialized));
        }

        #[test]
        fn random_walk_stays_legal(steps in prop::collection::vec(0usize..4, 0..40)) {
            let mut state = RecoveryState::Uninitialized;
            for pick in steps {
                let next = allowed_transitions(state);
                prop_assert!(!next.is_empty());
                let to = next[pick % next.len()];
                prop_assert!(validate_transition(state, to).is_ok());
                state = to;
            }
        }
    }
}
