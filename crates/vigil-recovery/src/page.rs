//! Shared state the built-in watchdogs operate on

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vigil_dom::{Document, Page, PagePhase};
use vigil_modules::ModuleRegistry;

/// Whether the emergency shell is in charge of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecoveryMode {
    /// Normal operation
    #[default]
    Normal,
    /// Emergency shell injected at `since`
    Active {
        /// Page time the mode was entered
        since: Duration,
    },
}

/// Page plus everything a repair may consult
#[derive(Debug, Clone)]
pub struct PageState {
    /// Document, storage and origin
    pub page: Page,
    /// Capability bindings
    pub modules: Arc<ModuleRegistry>,
    /// Load phase
    pub phase: PagePhase,
    /// Recovery mode marker
    pub mode: RecoveryMode,
}

impl PageState {
    /// Create state for a page in the `Loading` phase
    #[must_use]
    pub fn new(page: Page, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            page,
            modules,
            phase: PagePhase::Loading,
            mode: RecoveryMode::Normal,
        }
    }

    /// With phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase: PagePhase) -> Self {
        self.phase = phase;
        self
    }

    /// Document
    #[inline]
    #[must_use]
    pub fn doc(&self) -> &Document {
        &self.page.document
    }

    /// Mutable document
    #[inline]
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.page.document
    }

    /// Whether recovery mode is active
    #[inline]
    #[must_use]
    pub fn in_recovery(&self) -> bool {
        matches!(self.mode, RecoveryMode::Active { .. })
    }

    /// Enter recovery mode; keeps the original entry time if already active
    pub fn enter_recovery(&mut self, now: Duration) {
        if !self.in_recovery() {
            tracing::warn!(at_ms = now.as_millis() as u64, "entering recovery mode");
            self.mode = RecoveryMode::Active { since: now };
        }
    }

    /// Leave recovery mode
    pub fn exit_recovery(&mut self) {
        if let RecoveryMode::Active { since } = self.mode {
            tracing::info!(entered_ms = since.as_millis() as u64, "leaving recovery mode");
        }
        self.mode = RecoveryMode::Normal;
    }
}
