//! Error types for module resolution and capabilities

use vigil_dom::DomError;

/// Module errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    /// No binding under this name
    #[error("module not bound: {0}")]
    NotBound(String),

    /// Loading from a path failed
    #[error("failed to load '{path}': {reason}")]
    LoadFailed {
        /// Attempted path
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Loaded module does not define the expected binding
    #[error("module at '{path}' defines '{found}', expected '{expected}'")]
    BindingMismatch {
        /// Attempted path
        path: String,
        /// Expected binding name
        expected: String,
        /// Name the module actually defines
        found: String,
    },

    /// Navigation target has no panel
    #[error("tab not found: {0}")]
    TabNotFound(String),

    /// Capability call failed on the document
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// Module-specific failure
    #[error("{module}: {reason}")]
    Failed {
        /// Module name
        module: String,
        /// Failure reason
        reason: String,
    },
}
