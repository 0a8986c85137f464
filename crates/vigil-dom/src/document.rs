//! Document tree
//!
//! Provides [`Document`], an arena-backed element tree with the small set of
//! queries and mutations the page watchdogs rely on.
//!
//! Every mutation bumps [`Document::revision`], which lets callers observe
//! "did anything change" without diffing the tree.
//!
//! Slots of removed nodes are recycled. Each slot carries a generation, so a
//! [`NodeId`] kept past its node's removal never resolves to the newcomer.

use crate::error::DomError;
use crate::markup::{escape_attribute, escape_text, Markup};
use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};

/// Elements whose text never counts as visible content
const INVISIBLE_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    const PLACEHOLDER: Self = Self {
        index: 0,
        generation: 0,
    };
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}.{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Element payload: tag name plus ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
}

impl Element {
    /// Lower-cased tag name
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in insertion order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Element node
    Element(Element),
    /// Text node
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document
///
/// Always contains `<html>` with `<head>` and `<body>` children. Removed
/// subtrees are freed; their [`NodeId`]s become dangling and every accessor
/// reports them as missing.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Slot>,
    vacant: Vec<usize>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (`<html><head></head><body></body></html>`)
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            vacant: Vec::new(),
            root: NodeId::PLACEHOLDER,
            head: NodeId::PLACEHOLDER,
            body: NodeId::PLACEHOLDER,
            revision: 0,
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(root, head, None);
        doc.link(root, body, None);
        doc.root = root;
        doc.head = head;
        doc.body = body;
        doc
    }

    /// Root `<html>` element
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// `<head>` element
    #[inline]
    #[must_use]
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// `<body>` element
    #[inline]
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Mutation counter, incremented by every tree or attribute change
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Build a detached subtree from markup
    pub fn build(&mut self, markup: &Markup) -> NodeId {
        match markup {
            Markup::Text(text) => self.create_text(text.clone()),
            Markup::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.alloc(NodeData::Element(Element {
                    tag: tag.to_ascii_lowercase(),
                    attributes: attributes.iter().cloned().collect(),
                }));
                for child in children {
                    let child_id = self.build(child);
                    self.link(id, child_id, None);
                }
                id
            }
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.nodes.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.nodes.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(DomError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(DomError::NodeNotFound(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// Check whether the node still exists (attached or detached)
    #[inline]
    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Check whether the node is reachable from the root
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Node payload
    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).ok().map(|n| &n.data)
    }

    /// Element payload, `None` for text or missing nodes
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    /// Tag name of an element
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    /// Parent node
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Child nodes (empty for missing nodes)
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only
    #[must_use]
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|el| el.attributes.get(name))
            .map(String::as_str)
    }

    /// Check attribute presence
    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Check whether the element's `class` list contains `class`
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Check whether `ancestor` is `node` or one of its ancestors
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return self.exists(id);
            }
            current = self.parent(id);
        }
        false
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Descendants of `id` in document order (excluding `id`)
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First attached element with the given `id` attribute
    #[must_use]
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attribute(*n, "id") == Some(element_id))
    }

    /// Same as [`Document::element_by_id`] but returns an error when absent
    pub fn require_id(&self, element_id: &str) -> Result<NodeId, DomError> {
        self.element_by_id(element_id)
            .ok_or_else(|| DomError::ElementIdNotFound(element_id.to_string()))
    }

    /// Attached elements carrying `class`
    #[must_use]
    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements_by_class_within(self.root, class)
    }

    /// Elements below `scope` carrying `class`
    #[must_use]
    pub fn elements_by_class_within(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    /// Attached elements with the given tag name
    #[must_use]
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.tag_name(*n) == Some(tag.as_str()))
            .collect()
    }

    /// Concatenated text of the subtree
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeData::Text(text)) = self.data(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(NodeData::Text(text)) = self.data(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Number of non-whitespace characters a user would see in the subtree
    ///
    /// Text below `script`, `style`, `template` and `noscript` is ignored.
    #[must_use]
    pub fn visible_text_len(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            match self.data(next) {
                Some(NodeData::Text(text)) => {
                    count += text.chars().filter(|c| !c.is_whitespace()).count();
                }
                Some(NodeData::Element(el)) if !INVISIBLE_TAGS.contains(&el.tag.as_str()) => {
                    stack.extend(self.children(next).iter().copied());
                }
                _ => {}
            }
        }
        count
    }

    /// Serialize the children of `id`
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.serialize(*child, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tag
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(&escape_text(text)),
            Some(NodeData::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            None => {}
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn link(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        if let Ok(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Ok(node) = self.node_mut(parent) {
            match position {
                Some(pos) if pos <= node.children.len() => node.children.insert(pos, child),
                _ => node.children.push(child),
            }
        }
    }

    fn unlink(&mut self, child: NodeId) {
        let parent = self.parent(child);
        if let Some(parent) = parent {
            if let Ok(node) = self.node_mut(parent) {
                node.children.retain(|c| *c != child);
            }
        }
        if let Ok(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.element(parent).is_none() {
            self.node(parent)?;
            return Err(DomError::NotAnElement(parent));
        }
        self.node(child)?;
        if child == self.root || self.contains(child, parent) {
            return Err(DomError::HierarchyViolation { parent, child });
        }
        Ok(())
    }

    /// Append `child` to `parent`, moving it from its previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.unlink(child);
        self.link(parent, child, None);
        self.revision += 1;
        Ok(())
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.unlink(child);
        let position = match reference {
            Some(r) => Some(
                self.children(parent)
                    .iter()
                    .position(|c| *c == r)
                    .ok_or(DomError::NotAChild { parent, child: r })?,
            ),
            None => None,
        };
        self.link(parent, child, position);
        self.revision += 1;
        Ok(())
    }

    /// Remove `id` and free its subtree
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if id == self.root || id == self.head || id == self.body {
            return Err(DomError::PermanentNode(id));
        }
        self.unlink(id);
        self.free(id);
        self.revision += 1;
        Ok(())
    }

    fn free(&mut self, id: NodeId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            if let Some(slot) = self.nodes.get_mut(node.index) {
                if slot.generation == node.generation && slot.node.take().is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                    self.vacant.push(node.index);
                }
            }
        }
    }

    /// Number of node slots allocated, live or vacant
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Replace `old` with `new` at the same position in one step
    ///
    /// `new` is detached from wherever it was; `old` and its subtree are freed.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(old).ok_or(DomError::Detached(old))?;
        self.check_insertable(parent, new)?;
        if self.contains(old, new) {
            return Err(DomError::HierarchyViolation { parent, child: new });
        }
        self.unlink(new);
        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .ok_or(DomError::NotAChild { parent, child: old })?;
        if let Ok(node) = self.node_mut(parent) {
            node.children[position] = new;
        }
        if let Ok(node) = self.node_mut(new) {
            node.parent = Some(parent);
        }
        self.free(old);
        self.revision += 1;
        Ok(())
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), DomError> {
        let children = self.node(id)?.children.clone();
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            self.unlink(child);
            self.free(child);
        }
        self.revision += 1;
        Ok(())
    }

    /// Swap the whole content of `id` for freshly built markup
    pub fn set_inner_markup(&mut self, id: NodeId, markup: &[Markup]) -> Result<(), DomError> {
        if self.element(id).is_none() {
            self.node(id)?;
            return Err(DomError::NotAnElement(id));
        }
        self.clear_children(id)?;
        for fragment in markup {
            let child = self.build(fragment);
            self.link(id, child, None);
        }
        self.revision += 1;
        Ok(())
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        self.set_inner_markup(id, &[Markup::text(text)])
    }

    /// Set an attribute, bumping the revision only when the value changes
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let value = value.into();
        let el = self.element_mut(id)?;
        if el.attributes.get(name) == Some(&value) {
            return Ok(());
        }
        el.attributes.insert(name.to_string(), value);
        self.revision += 1;
        Ok(())
    }

    /// Remove an attribute; returns the previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let previous = self.element_mut(id)?.attributes.shift_remove(name);
        if previous.is_some() {
            self.revision += 1;
        }
        Ok(previous)
    }

    /// Add a class to the element's class list
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let list = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", list)
    }

    /// Remove a class from the element's class list
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if !self.has_class(id, class) {
            return Ok(());
        }
        let list: Vec<&str> = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect();
        let list = list.join(" ");
        self.set_attribute(id, "class", list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let main = doc.build(
            &Markup::element("main")
                .id("mainContent")
                .child(Markup::element("div").id("tabContent").class("panel")),
        );
        doc.append_child(doc.body(), main).unwrap();
        let tab = doc.element_by_id("tabContent").unwrap();
        (doc, main, tab)
    }

    #[test]
    fn new_document_has_skeleton() {
        let doc = Document::new();
        assert_eq!(doc.tag_name(doc.root()), Some("html"));
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn element_by_id_finds_attached_only() {
        let mut doc = Document::new();
        let detached = doc.build(&Markup::element("div").id("ghost"));
        assert!(doc.element_by_id("ghost").is_none());
        doc.append_child(doc.body(), detached).unwrap();
        assert_eq!(doc.element_by_id("ghost"), Some(detached));
    }

    #[test]
    fn append_rejects_cycles() {
        let (mut doc, main, tab) = sample();
        let err = doc.append_child(tab, main).unwrap_err();
        assert!(matches!(err, DomError::HierarchyViolation { .. }));
    }

    #[test]
    fn replace_with_keeps_position() {
        let mut doc = Document::new();
        let a = doc.build(&Markup::element("p").id("a"));
        let b = doc.build(&Markup::element("p").id("b"));
        let c = doc.build(&Markup::element("p").id("c"));
        for n in [a, b, c] {
            doc.append_child(doc.body(), n).unwrap();
        }
        let replacement = doc.build(&Markup::element("p").id("b2"));
        doc.replace_with(b, replacement).unwrap();

        assert_eq!(doc.children(doc.body()), &[a, replacement, c]);
        assert!(!doc.exists(b));
    }

    #[test]
    fn set_inner_markup_replaces_subtree() {
        let (mut doc, _, tab) = sample();
        doc.set_inner_markup(tab, &[Markup::element("span").with_text("hi")])
            .unwrap();
        assert_eq!(doc.inner_html(tab), "<span>hi</span>");
        assert_eq!(doc.text_content(tab), "hi");
    }

    #[test]
    fn visible_text_ignores_scripts() {
        let mut doc = Document::new();
        let script = doc.build(&Markup::element("script").with_text("var x = 1;"));
        doc.append_child(doc.body(), script).unwrap();
        assert_eq!(doc.visible_text_len(doc.body()), 0);

        let p = doc.build(&Markup::element("p").with_text("  ok  "));
        doc.append_child(doc.body(), p).unwrap();
        assert_eq!(doc.visible_text_len(doc.body()), 2);
    }

    #[test]
    fn class_helpers() {
        let (mut doc, _, tab) = sample();
        doc.add_class(tab, "active").unwrap();
        assert!(doc.has_class(tab, "panel"));
        assert!(doc.has_class(tab, "active"));
        doc.remove_class(tab, "panel").unwrap();
        assert_eq!(doc.attribute(tab, "class"), Some("active"));
    }

    #[test]
    fn unchanged_attribute_does_not_bump_revision() {
        let (mut doc, _, tab) = sample();
        doc.set_attribute(tab, "data-x", "1").unwrap();
        let rev = doc.revision();
        doc.set_attribute(tab, "data-x", "1").unwrap();
        assert_eq!(doc.revision(), rev);
    }

    #[test]
    fn removing_body_is_rejected() {
        let mut doc = Document::new();
        let body = doc.body();
        assert!(matches!(doc.remove(body), Err(DomError::PermanentNode(_))));
    }

    #[test]
    fn serialization_escapes() {
        let mut doc = Document::new();
        let p = doc.build(&Markup::element("p").attr("title", "a\"b").with_text("<x>"));
        doc.append_child(doc.body(), p).unwrap();
        assert_eq!(doc.outer_html(p), "<p title=\"a&quot;b\">&lt;x&gt;</p>");
    }

    #[test]
    fn removed_slots_are_reused_without_aliasing() {
        let (mut doc, _, tab) = sample();
        let fragment = [Markup::element("p").with_text("panel body")];
        doc.set_inner_markup(tab, &fragment).unwrap();
        let stale = doc.element_children(tab)[0];
        let capacity = doc.capacity();

        for _ in 0..50 {
            doc.set_inner_markup(tab, &fragment).unwrap();
        }

        assert_eq!(doc.capacity(), capacity);
        assert!(!doc.exists(stale));
        assert_ne!(doc.element_children(tab)[0], stale);
        assert!(matches!(doc.set_text(stale, "x"), Err(DomError::NodeNotFound(_))));
    }
}
