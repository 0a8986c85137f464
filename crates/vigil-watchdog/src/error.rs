//! Error types for the watchdog scheduler

use crate::scheduler::WatchdogId;

/// Scheduler errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchdogError {
    /// A watchdog with the same name is already registered
    #[error("watchdog '{0}' is already registered")]
    DuplicateName(String),

    /// Spec subscribes to no trigger and can never run
    #[error("watchdog '{0}' has no triggers")]
    NoTriggers(String),

    /// Unknown watchdog id
    #[error("watchdog not found: {0}")]
    NotFound(WatchdogId),

    /// No watchdog registered under this name
    #[error("no watchdog named '{0}'")]
    UnknownName(String),

    /// Watchdog exhausted its retry budget
    #[error("watchdog {0} is disabled")]
    Disabled(WatchdogId),
}
