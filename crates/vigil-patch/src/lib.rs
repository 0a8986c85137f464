//! Vigil Patch - resource tag and script corrections
//!
//! - [`CorsNormalizer`]: add `crossorigin="anonymous"` to external script and
//!   stylesheet tags by atomic element replacement
//! - [`script_errors`]: recognise and count opaque `"Script error."` events
//! - [`ScriptPathNormalizer`]: fix the casing of module script paths
//! - [`check_delimiters`]: static bracket validation of inline scripts, with
//!   [`legacy_balance`] kept as an opt-in

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cors;
pub mod delimiters;
pub mod error;
pub mod script_errors;
pub mod script_paths;

pub use cors::{CorsNormalizer, CorsReport, PatchedTag, CROSSORIGIN_VALUE};
pub use delimiters::{
    balance_inline_scripts, check_delimiters, check_inline_scripts, legacy_balance,
    DelimiterIssue, DelimiterReport, InlineScriptFinding,
};
pub use error::PatchError;
pub use script_errors::{
    is_opaque_script_error, record_script_error, reset_script_errors, script_error_count,
    OPAQUE_SCRIPT_ERROR, SCRIPT_ERROR_KEY,
};
pub use script_paths::{PathRewrite, ScriptPathNormalizer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
