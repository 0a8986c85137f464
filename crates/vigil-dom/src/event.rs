//! Page events
//!
//! Lifecycle and error events the supervisor consumes.

use serde::{Deserialize, Serialize};

/// Uncaught error as reported by the page's global error hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Error message
    pub message: String,
    /// Script URL, if known
    pub source: Option<String>,
    /// Line number (0 when unknown)
    pub line: u32,
    /// Column number (0 when unknown)
    pub column: u32,
}

impl ErrorEvent {
    /// Create an error event without location information
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            line: 0,
            column: 0,
        }
    }

    /// With source location
    #[inline]
    #[must_use]
    pub fn at(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
        self.source = Some(source.into());
        self.line = line;
        self.column = column;
        self
    }

    /// Check whether the event carries any location information
    #[inline]
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.source.as_deref().is_some_and(|s| !s.is_empty()) || self.line > 0
    }
}

/// Events delivered to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// `DOMContentLoaded`
    DomContentLoaded,
    /// Window `load`
    Load,
    /// Global `error`
    Error(ErrorEvent),
    /// A batch of DOM mutations was observed
    Mutation,
}

/// Load phase of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PagePhase {
    /// Scripts still evaluating
    #[default]
    Loading,
    /// `DOMContentLoaded` fired
    Interactive,
    /// Window `load` fired
    Complete,
}
