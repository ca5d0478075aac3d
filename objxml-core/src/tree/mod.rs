//! Output tree
//!
//! The serializer never formats text itself. It issues calls against the
//! [`TreeSink`] contract (create the root, create a child, set an attribute,
//! set text content), and the resulting [`Document`] is rendered afterwards
//! (see [`render`]).
//!
//! [`Document`] is an arena: nodes are addressed by [`NodeId`] and keep their
//! children in insertion order. An element holds either text or child
//! elements, never both.

pub mod render;

use crate::error::TreeError;

pub use render::{Encoding, RenderOptions};

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Minimal tree-building capability the serializer depends on.
pub trait TreeSink {
    /// Create the document's root element. A document has exactly one root.
    fn create_root(&mut self, name: &str) -> Result<NodeId, TreeError>;

    /// Append a new child element to `parent`.
    fn create_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError>;

    /// Set (or replace) an attribute on `node`.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError>;

    /// Set the text content of `node`; appends to any text already present.
    /// Empty text leaves the node untouched.
    fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), TreeError>;
}

/// What an element contains.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Children(Vec<NodeId>),
}

/// A single element of the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub content: Content,
}

impl Element {
    fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            content: Content::Empty,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.content {
            Content::Children(children) => children,
            _ => &[],
        }
    }
}

/// An owned XML document produced by one serialization call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    nodes: Vec<Element>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(Element::text)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    /// Children of `id` with the given element name, in document order.
    pub fn children_named<'d>(
        &'d self,
        id: NodeId,
        name: &'d str,
    ) -> impl Iterator<Item = NodeId> + 'd {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.name(*child) == Some(name))
    }

    /// First child of `id` with the given element name.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// Follow a path of element names down from the root (the root itself is
    /// not part of the path).
    pub fn find_path(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = self.root?;
        for name in path {
            current = self.find_child(current, name)?;
        }
        Some(current)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id.0))
    }

    fn push(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element::new(name));
        id
    }
}

impl TreeSink for Document {
    fn create_root(&mut self, name: &str) -> Result<NodeId, TreeError> {
        if let Some(root) = self.root {
            return Err(TreeError::RootExists(self.nodes[root.0].name.clone()));
        }
        let id = self.push(name);
        self.root = Some(id);
        Ok(id)
    }

    fn create_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        // Validate the parent before allocating so a failure leaves no orphan.
        let parent_element = self.element_mut(parent)?;
        if let Content::Text(_) = parent_element.content {
            return Err(TreeError::MixedContent(parent_element.name.clone()));
        }

        let id = self.push(name);
        let parent_element = self.element_mut(parent)?;
        match &mut parent_element.content {
            Content::Children(children) => children.push(id),
            content => *content = Content::Children(vec![id]),
        }
        Ok(id)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let element = self.element_mut(node)?;
        let existing = element.attributes.iter().position(|(key, _)| key == name);
        match existing {
            Some(pos) => element.attributes[pos].1 = value.to_string(),
            None => element
                .attributes
                .push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), TreeError> {
        let element = self.element_mut(node)?;
        if value.is_empty() {
            return Ok(());
        }
        match &mut element.content {
            Content::Text(text) => text.push_str(value),
            Content::Children(_) => return Err(TreeError::MixedContent(element.name.clone())),
            content => *content = Content::Text(value.to_string()),
        }
        Ok(())
    }
}
