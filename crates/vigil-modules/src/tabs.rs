//! Tab switching shared by stubs and panel modules

use crate::error::ModuleError;
use vigil_dom::ids::{TAB_ATTR, TAB_BUTTON_CLASS, TAB_PANEL_CLASS};
use vigil_dom::{Document, NodeId};

/// Panel element for `tab`
#[must_use]
pub fn find_panel(doc: &Document, tab: &str) -> Option<NodeId> {
    doc.elements_by_class(TAB_PANEL_CLASS)
        .into_iter()
        .find(|p| doc.attribute(*p, TAB_ATTR) == Some(tab))
}

/// Name of the currently visible tab
#[must_use]
pub fn active_tab(doc: &Document) -> Option<String> {
    doc.elements_by_class(TAB_PANEL_CLASS)
        .into_iter()
        .find(|p| doc.has_class(*p, "active"))
        .and_then(|p| doc.attribute(p, TAB_ATTR).map(str::to_string))
}

/// Show the panel for `tab`, hide the others and sync button state
///
/// # Errors
/// Returns `ModuleError::TabNotFound` when no panel carries `data-tab="{tab}"`;
/// the document is left untouched in that case.
pub fn activate_tab(doc: &mut Document, tab: &str) -> Result<(), ModuleError> {
    let target = find_panel(doc, tab).ok_or_else(|| ModuleError::TabNotFound(tab.to_string()))?;

    for panel in doc.elements_by_class(TAB_PANEL_CLASS) {
        if panel == target {
            doc.add_class(panel, "active")?;
            doc.remove_attribute(panel, "hidden")?;
        } else {
            doc.remove_class(panel, "active")?;
            doc.set_attribute(panel, "hidden", "")?;
        }
    }

    for button in doc.elements_by_class(TAB_BUTTON_CLASS) {
        if doc.attribute(button, TAB_ATTR) == Some(tab) {
            doc.add_class(button, "active")?;
        } else {
            doc.remove_class(button, "active")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_dom::Markup;

    fn tabbed() -> Document {
        let mut doc = Document::new();
        let nav = doc.build(&Markup::element("nav").id("tabContainer").children(
            ["dashboard", "orgChart"].map(|t| {
                Markup::element("button")
                    .class(TAB_BUTTON_CLASS)
                    .attr(TAB_ATTR, t)
                    .with_text(t)
            }),
        ));
        let content = doc.build(&Markup::element("div").id("tabContent").children(
            ["dashboard", "orgChart"].map(|t| {
                Markup::element("section")
                    .class(TAB_PANEL_CLASS)
                    .attr(TAB_ATTR, t)
            }),
        ));
        let body = doc.body();
        doc.append_child(body, nav).unwrap();
        doc.append_child(body, content).unwrap();
        doc
    }

    #[test]
    fn activate_switches_panels_and_buttons() {
        let mut doc = tabbed();
        activate_tab(&mut doc, "orgChart").unwrap();
        assert_eq!(active_tab(&doc).as_deref(), Some("orgChart"));

        let dashboard = find_panel(&doc, "dashboard").unwrap();
        assert!(doc.has_attribute(dashboard, "hidden"));

        let active_buttons: Vec<_> = doc
            .elements_by_class(TAB_BUTTON_CLASS)
            .into_iter()
            .filter(|b| doc.has_class(*b, "active"))
            .collect();
        assert_eq!(active_buttons.len(), 1);
    }

    #[test]
    fn missing_tab_leaves_document_untouched() {
        let mut doc = tabbed();
        let rev = doc.revision();
        assert_eq!(
            activate_tab(&mut doc, "settings"),
            Err(ModuleError::TabNotFound("settings".into()))
        );
        assert_eq!(doc.revision(), rev);
    }
}
