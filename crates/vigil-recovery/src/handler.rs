//! Error-triggered recovery
//!
//! Once armed, an uncaught error whose message names a content keyword
//! resets the content containers and navigates back to the default view.
//! Errors during the arm delay are ignored: the page is still booting and
//! its own scripts may throw harmlessly.

use crate::error::RecoveryError;
use crate::reset::{ContentReset, ResetReport};
use crate::state::{validate_transition, RecoveryState};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_dom::ids::TAB_CONTENT;
use vigil_dom::{Document, ErrorEvent};
use vigil_modules::Capability;

/// Default arm delay
pub const DEFAULT_ARM_DELAY: Duration = Duration::from_millis(3000);

/// Recovery handler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Delay after start before errors are acted on
    pub arm_delay_ms: u64,
    /// Case-insensitive substrings that mark an error as content-related
    pub keywords: Vec<String>,
    /// View navigated to after a reset
    pub default_view: String,
    /// Container ids cleared by a reset; the first receives the default panel
    pub containers: Vec<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            arm_delay_ms: 3000,
            keywords: vec!["tab".into(), "content".into()],
            default_view: "dashboard".into(),
            containers: vec![TAB_CONTENT.into()],
        }
    }
}

impl RecoveryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With arm delay
    #[inline]
    #[must_use]
    pub fn with_arm_delay(mut self, delay: Duration) -> Self {
        self.arm_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With keywords
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// With default view
    #[inline]
    #[must_use]
    pub fn with_default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = view.into();
        self
    }

    /// Arm delay as a duration
    #[inline]
    #[must_use]
    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(self.arm_delay_ms)
    }
}

/// Why an error was not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Handler was not armed
    NotArmed(RecoveryState),
    /// Message matched no keyword
    NoKeyword,
}

/// Result of [`ErrorTriggeredRecovery::handle_error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Nothing done
    Ignored(IgnoreReason),
    /// Content reset and default view shown
    Recovered {
        /// What the reset did
        reset: ResetReport,
        /// View navigated to
        view: String,
    },
    /// Content reset, but navigation failed; handler re-armed
    NavigationFailed {
        /// What the reset did
        reset: ResetReport,
        /// Navigation error
        error: String,
    },
    /// Reset itself failed; handler re-armed
    ResetFailed {
        /// Reset error
        error: String,
    },
}

impl HandleOutcome {
    /// Whether recovery ran (successfully or not)
    #[must_use]
    pub fn triggered(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

/// Arm-delayed, keyword-triggered recovery handler
#[derive(Debug, Clone)]
pub struct ErrorTriggeredRecovery {
    config: RecoveryConfig,
    reset: ContentReset,
    state: RecoveryState,
    started_at: Option<Duration>,
    recoveries: u64,
}

impl ErrorTriggeredRecovery {
    /// Create handler in `Uninitialized`
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        let reset = ContentReset::new(config.containers.iter().cloned(), config.default_view.clone());
        Self {
            config,
            reset,
            state: RecoveryState::Uninitialized,
            started_at: None,
            recoveries: 0,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Completed recoveries
    #[inline]
    #[must_use]
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    fn transition(&mut self, to: RecoveryState) -> Result<(), RecoveryError> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = %self.state, to = %to, "recovery transition");
        self.state = to;
        Ok(())
    }

    /// Start the arm delay at page time `now`
    ///
    /// # Errors
    /// Returns `StateMachineError::IllegalTransition` if already started.
    pub fn start(&mut self, now: Duration) -> Result<(), RecoveryError> {
        self.transition(RecoveryState::ArmDelay)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Arm once the delay has elapsed; returns the resulting state
    ///
    /// # Errors
    /// Propagates transition errors.
    pub fn poll(&mut self, now: Duration) -> Result<RecoveryState, RecoveryError> {
        if self.state == RecoveryState::ArmDelay {
            let started = self.started_at.unwrap_or_default();
            if now.saturating_sub(started) >= self.config.arm_delay() {
                self.transition(RecoveryState::Armed)?;
                tracing::info!(at_ms = now.as_millis() as u64, "recovery handler armed");
            }
        }
        Ok(self.state)
    }

    /// Whether `message` names a configured keyword
    #[must_use]
    pub fn matches_keyword(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.config
            .keywords
            .iter()
            .any(|k| !k.is_empty() && message.contains(&k.to_lowercase()))
    }

    /// React to an uncaught error at page time `now`
    ///
    /// `ui` performs the navigation; a stub is acceptable.
    ///
    /// # Errors
    /// Returns [`RecoveryError::StateMachine`] only on an internal ordering
    /// bug; reset and navigation failures are reported in the outcome.
    pub fn handle_error(
        &mut self,
        event: &ErrorEvent,
        now: Duration,
        doc: &mut Document,
        ui: &dyn Capability,
    ) -> Result<HandleOutcome, RecoveryError> {
        let state = self.poll(now)?;
        if state != RecoveryState::Armed {
            tracing::debug!(state = %state, message = %event.message, "error ignored, handler not armed");
            return Ok(HandleOutcome::Ignored(IgnoreReason::NotArmed(state)));
        }
        if !self.matches_keyword(&event.message) {
            return Ok(HandleOutcome::Ignored(IgnoreReason::NoKeyword));
        }

        self.transition(RecoveryState::Triggered)?;
        tracing::warn!(message = %event.message, "content error, resetting containers");

        let reset = match self.reset.reset(doc) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "content reset failed");
                self.transition(RecoveryState::Armed)?;
                return Ok(HandleOutcome::ResetFailed { error: e.to_string() });
            }
        };

        self.transition(RecoveryState::Recovering)?;
        let view = self.config.default_view.clone();
        let outcome = match ui.switch_tab(doc, &view) {
            Ok(()) => {
                self.recoveries += 1;
                tracing::info!(view = %view, stub = ui.is_stub(), "recovered to default view");
                HandleOutcome::Recovered { reset, view }
            }
            Err(e) => {
                tracing::warn!(view = %view, error = %e, "navigation after reset failed");
                HandleOutcome::NavigationFailed {
                    reset,
                    error: e.to_string(),
                }
            }
        };
        self.transition(RecoveryState::Armed)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateMachineError;
    use vigil_modules::{ModuleError, StubModule};

    #[derive(Debug)]
    struct NoNav;

    impl Capability for NoNav {
        fn name(&self) -> &str {
            "ui"
        }
        fn init(&self, _doc: &mut Document) -> Result<(), ModuleError> {
            Ok(())
        }
        fn render(&self, _doc: &mut Document) -> Result<(), ModuleError> {
            Ok(())
        }
        fn switch_tab(&self, _doc: &mut Document, tab: &str) -> Result<(), ModuleError> {
            Err(ModuleError::TabNotFound(tab.to_string()))
        }
    }

    fn armed() -> ErrorTriggeredRecovery {
        let mut handler = ErrorTriggeredRecovery::new(RecoveryConfig::default());
        handler.start(Duration::ZERO).unwrap();
        handler.poll(DEFAULT_ARM_DELAY).unwrap();
        handler
    }

    #[test]
    fn start_twice_is_illegal() {
        let mut handler = ErrorTriggeredRecovery::new(RecoveryConfig::default());
        handler.start(Duration::ZERO).unwrap();
        assert!(matches!(
            handler.start(Duration::ZERO),
            Err(RecoveryError::StateMachine(StateMachineError::IllegalTransition { .. }))
        ));
    }

    #[test]
    fn errors_before_start_are_ignored() {
        let mut handler = ErrorTriggeredRecovery::new(RecoveryConfig::default());
        let mut doc = Document::new();
        let outcome = handler
            .handle_error(&ErrorEvent::new("tab failed"), Duration::from_secs(60), &mut doc, &StubModule::new("ui"))
            .unwrap();
        assert_eq!(outcome, HandleOutcome::Ignored(IgnoreReason::NotArmed(RecoveryState::Uninitialized)));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let handler = armed();
        assert!(handler.matches_keyword("Cannot read properties of null (reading 'TabContent')"));
        assert!(handler.matches_keyword("CONTENT missing"));
        assert!(!handler.matches_keyword("network down"));
    }

    #[test]
    fn unrelated_error_does_not_trigger() {
        let mut handler = armed();
        let mut doc = Document::new();
        let outcome = handler
            .handle_error(&ErrorEvent::new("quota exceeded"), DEFAULT_ARM_DELAY, &mut doc, &StubModule::new("ui"))
            .unwrap();
        assert_eq!(outcome, HandleOutcome::Ignored(IgnoreReason::NoKeyword));
        assert_eq!(handler.state(), RecoveryState::Armed);
    }

    #[test]
    fn navigation_failure_rearms() {
        let mut handler = armed();
        let mut doc = Document::new();
        let outcome = handler
            .handle_error(&ErrorEvent::new("tab render failed"), DEFAULT_ARM_DELAY, &mut doc, &NoNav)
            .unwrap();
        assert!(matches!(outcome, HandleOutcome::NavigationFailed { .. }));
        assert_eq!(handler.state(), RecoveryState::Armed);
        assert_eq!(handler.recoveries(), 0);
    }
}
