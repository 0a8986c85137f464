//! Vigil Recovery - repairs that keep the dashboard usable
//!
//! # Core Concepts
//!
//! - [`ErrorTriggeredRecovery`]: arm-delayed, keyword-triggered reset and
//!   navigation back to the default view
//! - [`ContentReset`]: clear the content containers, recreate the default panel
//! - [`classify_error`]: map an uncaught error to an [`ErrorClass`]
//! - [`watchdogs`]: the built-in stall, white-screen and recovery-exit
//!   watchdogs over [`PageState`]
//! - [`toast`]: dismissible notices

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod classify;
pub mod error;
pub mod handler;
pub mod page;
pub mod reset;
pub mod state;
pub mod templates;
pub mod toast;
pub mod watchdogs;

pub use classify::{classify_error, ErrorClass};
pub use error::RecoveryError;
pub use handler::{ErrorTriggeredRecovery, HandleOutcome, IgnoreReason, RecoveryConfig, DEFAULT_ARM_DELAY};
pub use page::{PageState, RecoveryMode};
pub use reset::{ContentReset, ResetReport};
pub use state::{allowed_transitions, validate_transition, RecoveryState, StateMachineError};
pub use toast::{dismiss_toast, show_toast, toasts, ToastLevel, TOAST_CONTAINER_ID};
pub use watchdogs::{builtin_watchdogs, WatchdogSettings};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
