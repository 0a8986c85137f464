//! Content reset
//!
//! Clears the known content containers and recreates a minimal default
//! panel, leaving the page ready for navigation to the default view.

use crate::templates::default_panel;
use serde::{Deserialize, Serialize};
use vigil_dom::ids::{MAIN_CONTENT, TAB_CONTENT};
use vigil_dom::{DomError, Document, Markup, NodeId};

/// What a reset did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// Containers that were present and cleared
    pub cleared: Vec<String>,
    /// Whether the primary container had to be created
    pub created_container: bool,
    /// Recreated default panel
    #[serde(skip)]
    pub panel: Option<NodeId>,
}

/// Clears content containers and recreates the default panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReset {
    containers: Vec<String>,
    default_view: String,
}

impl Default for ContentReset {
    fn default() -> Self {
        Self::new([TAB_CONTENT], "dashboard")
    }
}

impl ContentReset {
    /// Create reset over `containers`; the first one receives the default panel
    #[must_use]
    pub fn new<I, S>(containers: I, default_view: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            containers: containers.into_iter().map(Into::into).collect(),
            default_view: default_view.into(),
        }
    }

    /// View the recreated panel belongs to
    #[must_use]
    pub fn default_view(&self) -> &str {
        &self.default_view
    }

    /// Run the reset
    ///
    /// A missing primary container is created inside `#mainContent`, or the
    /// body when that is missing too.
    ///
    /// # Errors
    /// Returns [`DomError`] if the document rejects a mutation.
    pub fn reset(&self, doc: &mut Document) -> Result<ResetReport, DomError> {
        let mut cleared = Vec::new();
        for id in &self.containers {
            if let Some(node) = doc.element_by_id(id) {
                doc.clear_children(node)?;
                cleared.push(id.clone());
            }
        }

        let primary_id = self.containers.first().map_or(TAB_CONTENT, String::as_str);
        let (primary, created_container) = match doc.element_by_id(primary_id) {
            Some(node) => (node, false),
            None => {
                let host = doc.element_by_id(MAIN_CONTENT).unwrap_or_else(|| doc.body());
                let node = doc.build(&Markup::element("div").id(primary_id));
                doc.append_child(host, node)?;
                (node, true)
            }
        };

        let panel = doc.build(&default_panel(&self.default_view));
        doc.append_child(primary, panel)?;

        tracing::info!(
            cleared = ?cleared,
            created_container,
            view = %self.default_view,
            "content reset"
        );

        Ok(ResetReport {
            cleared,
            created_container,
            panel: Some(panel),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vigil_modules::find_panel;

    #[test]
    fn clears_and_recreates_panel() {
        let mut doc = Document::new();
        let main = doc.build(
            &Markup::element("main").id(MAIN_CONTENT).child(
                Markup::element("div")
                    .id(TAB_CONTENT)
                    .child(Markup::element("section").with_text("broken orgChart")),
            ),
        );
        let body = doc.body();
        doc.append_child(body, main).unwrap();

        let report = ContentReset::default().reset(&mut doc).unwrap();
        assert_eq!(report.cleared, vec![TAB_CONTENT.to_string()]);
        assert!(!report.created_container);

        let tab = doc.element_by_id(TAB_CONTENT).unwrap();
        assert_eq!(doc.children(tab).len(), 1);
        assert!(!doc.text_content(tab).contains("broken"));
        assert!(find_panel(&doc, "dashboard").is_some());
    }

    #[test]
    fn missing_container_is_created() {
        let mut doc = Document::new();
        let report = ContentReset::default().reset(&mut doc).unwrap();
        assert!(report.cleared.is_empty());
        assert!(report.created_container);
        let tab = doc.element_by_id(TAB_CONTENT).unwrap();
        assert_eq!(doc.parent(tab), Some(doc.body()));
    }
}
