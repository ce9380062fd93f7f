//! Tree Nodes
//!
//! This module defines the node types that live in a document tree.
//!
//! Nodes come in three kinds: elements (named interior nodes that may carry
//! children), text nodes (leaves holding character data), and markers (inert
//! leaves used as placeholders for reactive content). A node's identity is its
//! `NodeId`; the reactive layer decides whether a re-render replaces content
//! by comparing identities, never by comparing structure.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

/// Unique identifier for a node in a document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A named interior node. The only kind that may hold children.
    Element {
        /// The element's tag name.
        tag: String,
    },

    /// A leaf holding character data.
    Text {
        /// The text content.
        text: String,
    },

    /// An inert marker. Contributes nothing to text content; used as the
    /// placeholder fixing the insertion point for reactive content.
    Marker,
}

/// A node in a document tree.
///
/// Parent and child links are stored by ID; the owning [`Document`] arena
/// resolves them. Nodes never own each other.
///
/// [`Document`]: crate::tree::Document
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    /// Whether the tracker's default container-resolution rule treats this
    /// node as a container.
    container: bool,
}

impl Node {
    /// Create a new node of the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            parent: None,
            children: SmallVec::new(),
            container: false,
        }
    }

    /// Create a new element node.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeKind::Element { tag: tag.into() })
    }

    /// Create a new text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text { text: text.into() })
    }

    /// Create a new marker node.
    pub fn marker() -> Self {
        Self::new(NodeKind::Marker)
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Get the node's parent, if attached to one.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Get the node's children in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut SmallVec<[NodeId; 4]> {
        &mut self.children
    }

    /// Whether this node can hold children.
    pub fn accepts_children(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    /// The node's own character data, if it is a text node.
    pub fn text_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    pub(crate) fn set_text(&mut self, new_text: impl Into<String>) {
        if let NodeKind::Text { text } = &mut self.kind {
            *text = new_text.into();
        }
    }

    /// Whether this node is marked as a container.
    pub fn is_container(&self) -> bool {
        self.container
    }

    pub(crate) fn set_container(&mut self, container: bool) {
        self.container = container;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn element_accepts_children() {
        let node = Node::element("div");
        assert!(node.accepts_children());
        assert_eq!(node.kind(), &NodeKind::Element { tag: "div".into() });
    }

    #[test]
    fn text_and_marker_are_leaves() {
        assert!(!Node::text("hello").accepts_children());
        assert!(!Node::marker().accepts_children());
    }

    #[test]
    fn text_value_is_readable() {
        let node = Node::text("hello");
        assert_eq!(node.text_value(), Some("hello"));
        assert_eq!(Node::marker().text_value(), None);

        // The constructor and the accessor share a concern but not a name.
        let mut renamed = Node::text("old");
        renamed.set_text("new");
        assert_eq!(renamed.text_value(), Some("new"));
    }

    #[test]
    fn nodes_start_detached() {
        let node = Node::element("div");
        assert!(node.parent().is_none());
        assert!(node.children().is_empty());
        assert!(!node.is_container());
    }
}
