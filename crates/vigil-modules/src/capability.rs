//! Capability interface
//!
//! Every collaborator the page depends on (`config`, `ui`, `orgChart`,
//! `raciMatrix`) is reached through [`Capability`], so a stub and a real
//! implementation are interchangeable.

use crate::error::ModuleError;
use std::fmt::Debug;
use vigil_dom::Document;

/// Names of the collaborators the dashboard expects
pub const CORE_MODULES: &[&str] = &["config", "ui", "orgChart", "raciMatrix"];

/// Minimal surface every module exposes
pub trait Capability: Send + Sync + Debug {
    /// Binding name
    fn name(&self) -> &str;

    /// One-time setup
    ///
    /// # Errors
    /// Returns [`ModuleError`] when setup fails.
    fn init(&self, doc: &mut Document) -> Result<(), ModuleError>;

    /// Render the module's content into the document
    ///
    /// # Errors
    /// Returns [`ModuleError`] when rendering fails.
    fn render(&self, doc: &mut Document) -> Result<(), ModuleError>;

    /// Make `tab` the visible view
    ///
    /// # Errors
    /// Returns `ModuleError::TabNotFound` when no panel exists for `tab`.
    fn switch_tab(&self, doc: &mut Document, tab: &str) -> Result<(), ModuleError>;

    /// Whether this is a fallback stand-in
    fn is_stub(&self) -> bool {
        false
    }
}
