//! Stub modules
//!
//! Stand-ins bound when a real collaborator is unavailable. They keep the
//! page interactive: tab switching works and panels show a placeholder
//! instead of staying empty.

use crate::capability::Capability;
use crate::error::ModuleError;
use crate::tabs::{activate_tab, find_panel};
use vigil_dom::{Document, Markup};

/// Placeholder shown by stub renders
pub const STUB_NOTICE: &str = "This section is temporarily unavailable. Showing cached layout.";

/// Fallback implementation of [`Capability`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubModule {
    name: String,
}

impl StubModule {
    /// Create stub for `name`
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn placeholder(&self) -> Markup {
        Markup::element("div")
            .class("vigil-stub")
            .attr("data-module", self.name.clone())
            .with_text(STUB_NOTICE)
    }
}

impl Capability for StubModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _doc: &mut Document) -> Result<(), ModuleError> {
        tracing::debug!(module = %self.name, "stub init");
        Ok(())
    }

    /// Fill the module's own panel with a placeholder, but only when empty
    fn render(&self, doc: &mut Document) -> Result<(), ModuleError> {
        let Some(panel) = find_panel(doc, &self.name) else {
            return Ok(());
        };
        if doc.children(panel).is_empty() {
            doc.set_inner_markup(panel, &[self.placeholder()])?;
        }
        Ok(())
    }

    fn switch_tab(&self, doc: &mut Document, tab: &str) -> Result<(), ModuleError> {
        activate_tab(doc, tab)
    }

    fn is_stub(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_dom::ids::{TAB_ATTR, TAB_PANEL_CLASS};

    #[test]
    fn render_fills_empty_panel_once() {
        let mut doc = Document::new();
        let panel = doc.build(
            &Markup::element("section")
                .class(TAB_PANEL_CLASS)
                .attr(TAB_ATTR, "orgChart"),
        );
        doc.append_child(doc.body(), panel).unwrap();

        let stub = StubModule::new("orgChart");
        stub.render(&mut doc).unwrap();
        assert!(doc.text_content(panel).contains("temporarily unavailable"));

        let rev = doc.revision();
        stub.render(&mut doc).unwrap();
        assert_eq!(doc.revision(), rev);
    }

    #[test]
    fn render_without_panel_is_tolerated() {
        let mut doc = Document::new();
        assert!(StubModule::new("raciMatrix").render(&mut doc).is_ok());
        assert!(StubModule::new("raciMatrix").is_stub());
    }
}
