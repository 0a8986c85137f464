//! Vigil page model
//!
//! The shared mutable resource every watchdog inspects and repairs.
//!
//! # Core Concepts
//!
//! - [`Document`]: arena-backed element tree with a mutation counter
//! - [`Markup`]: typed fragments used for whole-subtree swaps
//! - [`LocalStorage`]: page-scoped key/value store with JSON helpers
//! - [`PageEvent`]/[`ErrorEvent`]: lifecycle and error events
//! - [`Page`]: document + storage + origin bundle
//!
//! # Example
//!
//! ```rust
//! use vigil_dom::{Document, Markup};
//!
//! let mut doc = Document::new();
//! let main = doc.build(&Markup::element("main").id("mainContent"));
//! doc.append_child(doc.body(), main).unwrap();
//! assert_eq!(doc.element_by_id("mainContent"), Some(main));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod document;
mod error;
mod event;
mod markup;
mod storage;

pub use document::{Document, Element, NodeData, NodeId};
pub use error::DomError;
pub use event::{ErrorEvent, PageEvent, PagePhase};
pub use markup::Markup;
pub use storage::LocalStorage;

/// Well-known element ids and classes of the dashboard page
pub mod ids {
    /// Main content wrapper
    pub const MAIN_CONTENT: &str = "mainContent";
    /// Container holding the tab panels
    pub const TAB_CONTENT: &str = "tabContent";
    /// Container holding the tab buttons
    pub const TAB_CONTAINER: &str = "tabContainer";
    /// Top navigation
    pub const MAIN_NAV: &str = "main-nav";
    /// Class of every tab panel
    pub const TAB_PANEL_CLASS: &str = "tab-content";
    /// Class of every tab button
    pub const TAB_BUTTON_CLASS: &str = "tab-btn";
    /// Attribute naming the tab a button or panel belongs to
    pub const TAB_ATTR: &str = "data-tab";
}

/// Document, storage and origin of one page instance
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Document tree
    pub document: Document,
    /// Local storage
    pub storage: LocalStorage,
    /// Page origin (`scheme://host[:port]`), used to decide what is external
    pub origin: Option<String>,
}

impl Page {
    /// Create an empty page
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// With a prepared document
    #[inline]
    #[must_use]
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
