//! Error types for the supervisor
//!
//! Wraps the errors of every component crate so callers deal with a single
//! [`VigilError`].

use std::path::PathBuf;
use vigil_dom::DomError;
use vigil_modules::ModuleError;
use vigil_patch::PatchError;
use vigil_recovery::RecoveryError;
use vigil_watchdog::WatchdogError;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Value out of range or inconsistent
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path
        field: String,
        /// What is wrong
        reason: String,
    },
}

/// Settings store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Settings object failed validation
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Field name
        field: String,
        /// What is wrong
        reason: String,
    },

    /// Storage read or write failed
    #[error("storage error: {0}")]
    Storage(#[from] DomError),
}

/// HTTP client errors
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Base URL or path did not form a valid URL
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request failed
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },
}

/// Main supervisor error type
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings error
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Document error
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// Scheduler error
    #[error("watchdog error: {0}")]
    Watchdog(#[from] WatchdogError),

    /// Module error
    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    /// Patch error
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    /// Recovery error
    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// Runtime stopped before the request was handled
    #[error("runtime stopped")]
    RuntimeStopped,
}

impl VigilError {
    /// Whether the supervisor can keep running after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::RuntimeStopped)
    }
}
