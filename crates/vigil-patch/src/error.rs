//! Error types for page patching

use vigil_dom::DomError;

/// Patch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// Page origin is not a valid absolute URL
    #[error("invalid page origin '{origin}': {reason}")]
    InvalidOrigin {
        /// Offending value
        origin: String,
        /// Parser message
        reason: String,
    },

    /// Document mutation failed
    #[error("document error: {0}")]
    Dom(#[from] DomError),
}
