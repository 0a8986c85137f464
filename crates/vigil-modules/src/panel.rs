//! Markup-backed module
//!
//! A real [`Capability`] that renders fixed markup into its tab panel. Used
//! for the bundled dashboard views and wherever a concrete module is needed
//! without a script behind it.

use crate::capability::Capability;
use crate::error::ModuleError;
use crate::tabs::{activate_tab, find_panel};
use vigil_dom::{Document, Markup};

/// Module that owns one tab panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelModule {
    name: String,
    panel: String,
    content: Vec<Markup>,
}

impl PanelModule {
    /// Create module `name` rendering into the panel with the same tab name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            panel: name.clone(),
            name,
            content: Vec::new(),
        }
    }

    /// Render into a differently named panel
    #[must_use]
    pub fn with_panel(mut self, panel: impl Into<String>) -> Self {
        self.panel = panel.into();
        self
    }

    /// Content to render
    #[must_use]
    pub fn with_content(mut self, content: impl IntoIterator<Item = Markup>) -> Self {
        self.content = content.into_iter().collect();
        self
    }
}

impl Capability for PanelModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _doc: &mut Document) -> Result<(), ModuleError> {
        Ok(())
    }

    fn render(&self, doc: &mut Document) -> Result<(), ModuleError> {
        let panel = find_panel(doc, &self.panel).ok_or_else(|| ModuleError::Failed {
            module: self.name.clone(),
            reason: format!("panel '{}' missing", self.panel),
        })?;
        doc.set_inner_markup(panel, &self.content)?;
        Ok(())
    }

    fn switch_tab(&self, doc: &mut Document, tab: &str) -> Result<(), ModuleError> {
        activate_tab(doc, tab)
    }
}
