//! Dismissible notices
//!
//! Errors the user should know about are rendered as toasts in a fixed
//! container instead of being left in the console.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use ulid::Ulid;
use vigil_dom::{DomError, Document, Markup, NodeId};

/// Id of the toast container
pub const TOAST_CONTAINER_ID: &str = "vigil-toasts";

/// Class of every toast
pub const TOAST_CLASS: &str = "vigil-toast";

/// Severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    /// Informational
    Info,
    /// Degraded but usable
    Warning,
    /// Something failed
    Error,
}

impl Display for ToastLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

fn container(doc: &mut Document) -> Result<NodeId, DomError> {
    if let Some(existing) = doc.element_by_id(TOAST_CONTAINER_ID) {
        return Ok(existing);
    }
    let node = doc.build(
        &Markup::element("div")
            .id(TOAST_CONTAINER_ID)
            .attr("aria-live", "polite"),
    );
    let body = doc.body();
    doc.append_child(body, node)?;
    Ok(node)
}

/// Append a toast and return its id
///
/// # Errors
/// Returns [`DomError`] if the container cannot be created.
pub fn show_toast(doc: &mut Document, level: ToastLevel, message: &str) -> Result<String, DomError> {
    let host = container(doc)?;
    let id = format!("toast-{}", Ulid::new().to_string().to_lowercase());
    let toast = doc.build(
        &Markup::element("div")
            .id(id.clone())
            .class(TOAST_CLASS)
            .class(format!("{TOAST_CLASS}-{level}"))
            .attr("role", if level == ToastLevel::Error { "alert" } else { "status" })
            .child(Markup::element("span").class("vigil-toast-message").with_text(message))
            .child(
                Markup::element("button")
                    .class("vigil-toast-dismiss")
                    .attr("data-dismiss", id.clone())
                    .attr("aria-label", "Dismiss")
                    .with_text("\u{d7}"),
            ),
    );
    doc.append_child(host, toast)?;
    tracing::debug!(toast = %id, level = %level, "toast shown");
    Ok(id)
}

/// Remove the toast with `id`; returns whether it existed
///
/// # Errors
/// Returns [`DomError`] if removal fails.
pub fn dismiss_toast(doc: &mut Document, id: &str) -> Result<bool, DomError> {
    match doc.element_by_id(id) {
        Some(node) if doc.has_class(node, TOAST_CLASS) => {
            doc.remove(node)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Ids of the toasts currently shown, oldest first
#[must_use]
pub fn toasts(doc: &Document) -> Vec<String> {
    doc.elements_by_class(TOAST_CLASS)
        .into_iter()
        .filter_map(|t| doc.attribute(t, "id").map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_then_dismiss() {
        let mut doc = Document::new();
        let a = show_toast(&mut doc, ToastLevel::Error, "Org chart failed to load").unwrap();
        let b = show_toast(&mut doc, ToastLevel::Info, "Recovered").unwrap();
        assert_ne!(a, b);
        assert_eq!(toasts(&doc), vec![a.clone(), b.clone()]);

        let node = doc.element_by_id(&a).unwrap();
        assert_eq!(doc.attribute(node, "role"), Some("alert"));
        assert!(doc.has_class(node, "vigil-toast-error"));

        assert!(dismiss_toast(&mut doc, &a).unwrap());
        assert!(!dismiss_toast(&mut doc, &a).unwrap());
        assert_eq!(toasts(&doc), vec![b]);
    }

    #[test]
    fn dismiss_ignores_non_toasts() {
        let mut doc = Document::new();
        let other = doc.build(&Markup::element("div").id("mainContent"));
        let body = doc.body();
        doc.append_child(body, other).unwrap();
        assert!(!dismiss_toast(&mut doc, "mainContent").unwrap());
        assert!(doc.element_by_id("mainContent").is_some());
    }
}
