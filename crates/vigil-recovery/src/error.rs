//! Error types for recovery

use crate::state::StateMachineError;
use vigil_dom::DomError;
use vigil_modules::ModuleError;

/// Recovery errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    /// Handler used out of order
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Document mutation failed
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// Capability call failed
    #[error("module error: {0}")]
    Module(#[from] ModuleError),
}
