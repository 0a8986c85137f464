//! Typed markup fragments
//!
//! [`Markup`] replaces raw `innerHTML` strings: repairs build fragments with
//! the builder methods and hand them to [`crate::Document::set_inner_markup`].

/// Markup fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Element with attributes and children
    Element {
        /// Tag name
        tag: String,
        /// Attributes in order
        attributes: Vec<(String, String)>,
        /// Child fragments
        children: Vec<Markup>,
    },
    /// Text content
    Text(String),
}

impl Markup {
    /// Start an element fragment
    #[inline]
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Text fragment
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Set an attribute (replaces an existing value with the same name)
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            let name = name.into();
            let value = value.into();
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => attributes.push((name, value)),
            }
        }
        self
    }

    /// Set the `id` attribute
    #[inline]
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Add a class to the `class` attribute
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if let Self::Element { attributes, .. } = &mut self {
            match attributes.iter_mut().find(|(n, _)| n == "class") {
                Some((_, list)) if !list.is_empty() => {
                    list.push(' ');
                    list.push_str(&class);
                }
                Some((_, list)) => *list = class,
                None => attributes.push(("class".to_string(), class)),
            }
        }
        self
    }

    /// Append a child fragment
    #[must_use]
    pub fn child(mut self, child: Markup) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Append several child fragments
    #[must_use]
    pub fn children(mut self, items: impl IntoIterator<Item = Markup>) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.extend(items);
        }
        self
    }

    /// Append a text child
    #[inline]
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.child(Self::text(text))
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_replaces_existing() {
        let m = Markup::element("div").id("a").id("b");
        match m {
            Markup::Element { attributes, .. } => {
                assert_eq!(attributes, vec![("id".to_string(), "b".to_string())]);
            }
            Markup::Text(_) => panic!("expected element"),
        }
    }

    #[test]
    fn class_accumulates() {
        let m = Markup::element("div").class("a").class("b");
        match m {
            Markup::Element { attributes, .. } => {
                assert_eq!(attributes, vec![("class".to_string(), "a b".to_string())]);
            }
            Markup::Text(_) => panic!("expected element"),
        }
    }

    #[test]
    fn text_ignores_builder_calls() {
        let m = Markup::text("x").id("ignored").child(Markup::text("y"));
        assert_eq!(m, Markup::text("x"));
    }
}
