//! Vigil Modules - capability registry with stub fallback
//!
//! Collaborators are looked up by name through a layered search (exact,
//! alias, case-insensitive, fuzzy). A miss binds a stub so callers always
//! get something they can call, and an optional background load swaps the
//! stub for the real module once it arrives.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod error;
pub mod loader;
pub mod panel;
pub mod registry;
pub mod stub;
pub mod tabs;

pub use capability::{Capability, CORE_MODULES};
pub use error::ModuleError;
pub use loader::{
    FallbackResolver, LoadAttempt, LoadOutcome, ManifestLoader, ModuleLoader, ModuleSpec,
    Resolution, DEFAULT_LOAD_TIMEOUT,
};
pub use panel::PanelModule;
pub use registry::{Binding, BindingOrigin, LookupStep, ModuleRegistry, Resolved};
pub use stub::{StubModule, STUB_NOTICE};
pub use tabs::{activate_tab, active_tab, find_panel};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
