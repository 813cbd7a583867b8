//! Owned HTML document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by [`NodeId`].
//! A detached node stays valid until the document is dropped. Removed children
//! are released to a free list and their slots are handed out again, so a
//! [`NodeId`] of a removed node must not be used afterwards.

mod parser;
mod selector;
mod serialize;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use parser::{
    DomError,
    parse_document,
};
pub use selector::{
    Selector,
    SelectorError,
};

use crate::types::SourceRange;

/// Document handle shared between the language engine and UI glue.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Wraps a document into a [`SharedDocument`].
#[must_use]
pub fn share(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    /// Raw declaration between `<!` and `>`, e.g. `DOCTYPE html`.
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with a lowercase tag name and attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into().to_ascii_lowercase(), attrs: Vec::new() }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name)).map(|a| a.value.as_str())
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Sets an attribute, replacing an existing one of the same name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
            attr.value = value;
        } else {
            self.attrs.push(Attribute { name: name.to_ascii_lowercase(), value });
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Arena slot.
#[derive(Debug, Clone)]
struct Node {
    /// Node payload
    data: NodeData,
    /// Parent node, `None` for the root and detached nodes
    parent: Option<NodeId>,
    /// Children in document order
    children: Vec<NodeId>,
    /// Where the node came from in the parsed markup
    range: Option<SourceRange>,
}

impl Node {
    /// Creates a detached node.
    const fn new(data: NodeData) -> Self {
        Self { data, parent: None, children: Vec::new(), range: None }
    }
}

/// An HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Arena of node slots; index 0 is the root.
    nodes: Vec<Node>,
    /// Released slots, reused before the arena grows
    free: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: vec![Node::new(NodeData::Document)], free: Vec::new() }
    }

    /// Parses markup into a new document.
    pub fn parse(source: &str) -> Result<Self, DomError> {
        parse_document(source)
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node slot for `id`.
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Returns the mutable node slot for `id`.
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Element children only, in document order.
    #[must_use]
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|c| self.element(*c).is_some()).collect()
    }

    /// Where the node was found in the parsed markup, if it was parsed.
    #[must_use]
    pub fn source_range(&self, id: NodeId) -> Option<SourceRange> {
        self.node(id)?.range
    }

    pub(crate) fn set_source_range(&mut self, id: NodeId, range: SourceRange) {
        if let Some(node) = self.node_mut(id) {
            node.range = Some(range);
        }
    }

    /// Number of arena slots, free ones included.
    #[must_use]
    pub fn allocated_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Allocates a detached node, reusing a released slot when there is one.
    pub fn create_node(&mut self, data: NodeData) -> NodeId {
        if let Some(id) = self.free.pop()
            && let Some(slot) = self.node_mut(id)
        {
            *slot = Node::new(data);
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_node(NodeData::Element(Element::new(name)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Text(text.into()))
    }

    /// Appends `child` to `parent`, detaching it from its previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Appends text to `parent`, merging with a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let last = self.children(parent).last().copied();
        if let Some(last) = last
            && let Some(Node { data: NodeData::Text(existing), .. }) = self.node_mut(last)
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    /// Removes a node from its parent. The node stays valid as a detached subtree.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Removes every child of `id` and releases their subtrees.
    ///
    /// Detach a node first to keep it.
    pub fn remove_children(&mut self, id: NodeId) {
        let mut stack =
            self.node_mut(id).map(|n| std::mem::take(&mut n.children)).unwrap_or_default();
        while let Some(current) = stack.pop() {
            let Some(node) = self.node_mut(current) else {
                continue;
            };
            stack.append(&mut node.children);
            *node = Node::new(NodeData::Text(String::new()));
            self.free.push(current);
        }
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Element ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if self.element(parent).is_some() {
                result.push(parent);
            }
            current = self.parent(parent);
        }
        result
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    /// Sets an attribute. Returns `false` when `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        self.element_mut(id).map(|e| e.set_attr(name, value)).is_some()
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.remove_attr(name);
        }
    }

    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        if element.has_class(class) {
            return;
        }
        let classes = match element.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        element.set_attr("class", classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let Some(existing) = element.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            element.remove_attr("class");
        } else {
            let remaining = remaining.join(" ");
            element.set_attr("class", remaining);
        }
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeData::Text(text)) = self.data(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                Some(NodeData::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    ///
    /// A lone existing text child is updated in place.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if text.is_empty() {
            self.remove_children(id);
            return;
        }
        let single = match self.children(id) {
            [only] => Some(*only),
            _ => None,
        };
        if let Some(only) = single
            && let Some(Node { data: NodeData::Text(existing), .. }) = self.node_mut(only)
        {
            if existing != text {
                text.clone_into(existing);
            }
            return;
        }
        self.remove_children(id);
        self.append_text(id, text);
    }

    /// Leaves `id` with `child` followed by a single text node.
    ///
    /// `child` may sit anywhere below `id`. When the children already are
    /// `child` and a text node, the text is updated in place.
    pub fn set_text_after(&mut self, id: NodeId, child: NodeId, text: &str) {
        if let &[first, last] = self.children(id)
            && first == child
            && let Some(Node { data: NodeData::Text(existing), .. }) = self.node_mut(last)
        {
            if existing != text {
                text.clone_into(existing);
            }
            return;
        }
        self.detach(child);
        self.remove_children(id);
        self.append_child(id, child);
        self.append_text(id, text);
    }

    /// Serializes the children of `id`.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::serialize_children(self, id, &mut out);
        out
    }

    /// Serializes `id` including its own tag.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::serialize_node(self, id, &mut out);
        out
    }

    /// Replaces the children of `id` with the parsed `html` fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), DomError> {
        if self.element(id).is_none() {
            return Ok(());
        }
        self.remove_children(id);
        parser::parse_into(self, id, html)
    }

    /// Serializes the whole document.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// The `<html>` element.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|c| self.tag_name(*c) == Some("html"))
    }

    /// The first `<body>` element.
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.first_element_named("body")
    }

    /// The first element with the given tag name, in document order.
    #[must_use]
    pub fn first_element_named(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root()).into_iter().find(|n| self.tag_name(*n) == Some(name))
    }

    #[must_use]
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.attribute(*n, "id") == Some(element_id))
    }

    /// Elements carrying attribute `name`, in document order.
    #[must_use]
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|n| self.has_attribute(*n, name))
            .collect()
    }

    /// Descendants of `scope` matching `selector`, in document order.
    #[must_use]
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope).into_iter().filter(|n| selector.matches(self, *n)).collect()
    }

    /// First descendant of `scope` matching `selector`.
    #[must_use]
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|n| selector.matches(self, *n))
    }

    /// Parses `css` and queries the whole document.
    pub fn select(&self, css: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(css)?;
        Ok(self.query_selector_all(self.root(), &selector))
    }
}
