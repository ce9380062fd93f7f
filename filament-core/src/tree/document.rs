//! Document
//!
//! The document is an in-memory tree of nodes: a node arena indexed by ID plus
//! parent/child links and a fixed root element. It stands in for whatever
//! visual tree the host embeds the library into, which keeps the reactive core
//! testable without a live rendering surface.
//!
//! # Mutation Observers
//!
//! The document supports a deliberately narrow observation primitive: a
//! callback watching a subtree that fires "something changed" whenever a
//! child-list mutation happens anywhere under its target, with no detail about
//! which nodes changed. The tracker uses it only to re-check containment.
//! Character-data updates ([`Document::set_text`]) are not child-list
//! mutations and do not fire observers.
//!
//! Observer callbacks run after the document lock is released, so a callback
//! may freely re-enter the document, including mutating the tree and
//! disconnecting itself. A mutation made inside a callback is not re-delivered
//! to that same callback while it runs; the coarse notification carries no
//! detail to lose, and the callback re-inspects the document anyway.
//!
//! # Thread Safety
//!
//! The document is a cheaply cloneable handle; clones share the same tree.
//! The arena sits behind a `parking_lot::RwLock`, which callbacks never hold
//! while running.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::error::Error;
use super::node::{Node, NodeId, NodeKind};

/// Unique identifier for a mutation observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Callback invoked when a child-list mutation happens under the observed
/// subtree. Receives no detail; observers re-inspect the document themselves.
pub type ObserverCallback = Box<dyn FnMut() + Send>;

struct Observer {
    id: ObserverId,
    target: NodeId,
    active: Arc<AtomicBool>,
    callback: Arc<Mutex<ObserverCallback>>,
}

struct DocumentInner {
    nodes: IndexMap<NodeId, Node>,
    root: NodeId,
    observers: Vec<Observer>,
}

impl DocumentInner {
    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(Node::parent);
        }
        false
    }

    /// Whether `node` reaches the root through parent links.
    fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Unlink `node` from its parent, returning the parent if there was one.
    fn unlink(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&node).and_then(Node::parent)?;
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children_mut().retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.set_parent(None);
        }
        Some(parent)
    }

    /// Collect the callbacks of active observers watching any of the mutated
    /// parents. Runs under the lock; the callbacks run after it drops.
    fn affected_observers(
        &self,
        parents: &[NodeId],
    ) -> Vec<(Arc<AtomicBool>, Arc<Mutex<ObserverCallback>>)> {
        self.observers
            .iter()
            .filter(|obs| {
                obs.active.load(Ordering::SeqCst)
                    && parents.iter().any(|p| self.contains(obs.target, *p))
            })
            .map(|obs| (Arc::clone(&obs.active), Arc::clone(&obs.callback)))
            .collect()
    }
}

/// A cloneable handle to an in-memory document tree.
#[derive(Clone)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
}

impl Document {
    /// Create a new document with an empty root element.
    pub fn new() -> Self {
        let root = Node::element("body");
        let root_id = root.id();
        let mut nodes = IndexMap::new();
        nodes.insert(root_id, root);
        Self {
            inner: Arc::new(RwLock::new(DocumentInner {
                nodes,
                root: root_id,
                observers: Vec::new(),
            })),
        }
    }

    /// Get the root element's ID.
    pub fn root(&self) -> NodeId {
        self.inner.read().root
    }

    fn insert_node(&self, node: Node) -> NodeId {
        let id = node.id();
        self.inner.write().nodes.insert(id, node);
        id
    }

    /// Create a detached element node.
    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.insert_node(Node::element(tag))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.insert_node(Node::text(text))
    }

    /// Create a detached marker node.
    pub fn create_marker(&self) -> NodeId {
        self.insert_node(Node::marker())
    }

    /// Mark or unmark an element as a container for the tracker's default
    /// container-resolution rule.
    pub fn set_container(&self, node: NodeId, container: bool) -> Result<(), Error> {
        let mut inner = self.inner.write();
        let n = inner.nodes.get_mut(&node).ok_or(Error::UnknownNode(node))?;
        n.set_container(container);
        Ok(())
    }

    /// Get a node's parent.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.read().nodes.get(&node).and_then(Node::parent)
    }

    /// Get a node's children in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .get(&node)
            .map(|n| n.children().to_vec())
            .unwrap_or_default()
    }

    /// Get a clone of a node's kind.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.read().nodes.get(&node).map(|n| n.kind().clone())
    }

    /// Replace a text node's character data.
    ///
    /// Not a child-list mutation: observers do not fire.
    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> Result<(), Error> {
        let mut inner = self.inner.write();
        let n = inner.nodes.get_mut(&node).ok_or(Error::UnknownNode(node))?;
        n.set_text(text);
        Ok(())
    }

    /// Whether `node` is attached to the live tree.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.read().is_connected(node)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.read().contains(ancestor, node)
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that is already attached elsewhere is moved. Fails with
    /// [`Error::Cycle`] if `parent` sits inside `child`'s own subtree.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let mutated = {
            let mut inner = self.inner.write();
            if !inner.nodes.contains_key(&child) {
                return Err(Error::UnknownNode(child));
            }
            match inner.nodes.get(&parent) {
                None => return Err(Error::UnknownNode(parent)),
                Some(p) if !p.accepts_children() => return Err(Error::NoParent(parent)),
                Some(_) => {}
            }
            // A parent inside the child's own subtree would close a parent
            // link cycle and make every later containment walk diverge.
            if inner.contains(child, parent) {
                return Err(Error::Cycle(child));
            }

            let mut parents = Vec::new();
            if let Some(old_parent) = inner.unlink(child) {
                parents.push(old_parent);
            }
            inner
                .nodes
                .get_mut(&parent)
                .expect("parent checked above")
                .children_mut()
                .push(child);
            inner
                .nodes
                .get_mut(&child)
                .expect("child checked above")
                .set_parent(Some(parent));
            parents.push(parent);
            inner.affected_observers(&parents)
        };
        self.dispatch(mutated);
        Ok(())
    }

    /// Insert `new` into the tree immediately before `reference`.
    ///
    /// Fails with [`Error::NoParent`] if `reference` is not attached.
    /// Inserting a node immediately before itself is a no-op.
    pub fn insert_before(&self, new: NodeId, reference: NodeId) -> Result<(), Error> {
        // Inserting a node before itself already satisfies the postcondition.
        if new == reference {
            return Ok(());
        }
        let mutated = {
            let mut inner = self.inner.write();
            if !inner.nodes.contains_key(&new) {
                return Err(Error::UnknownNode(new));
            }
            let parent = inner
                .nodes
                .get(&reference)
                .ok_or(Error::UnknownNode(reference))?
                .parent()
                .ok_or(Error::NoParent(reference))?;
            if inner.contains(new, parent) {
                return Err(Error::Cycle(new));
            }

            let mut parents = Vec::new();
            if let Some(old_parent) = inner.unlink(new) {
                parents.push(old_parent);
            }
            let parent_node = inner
                .nodes
                .get_mut(&parent)
                .expect("attached reference implies a live parent");
            let index = parent_node
                .children()
                .iter()
                .position(|c| *c == reference)
                .expect("reference is a child of its parent");
            parent_node.children_mut().insert(index, new);
            inner
                .nodes
                .get_mut(&new)
                .expect("new node checked above")
                .set_parent(Some(parent));
            parents.push(parent);
            inner.affected_observers(&parents)
        };
        self.dispatch(mutated);
        Ok(())
    }

    /// Detach `node` from its parent. Detaching an already-detached node is a
    /// no-op.
    pub fn detach(&self, node: NodeId) -> Result<(), Error> {
        let mutated = {
            let mut inner = self.inner.write();
            if !inner.nodes.contains_key(&node) {
                return Err(Error::UnknownNode(node));
            }
            match inner.unlink(node) {
                Some(parent) => inner.affected_observers(&[parent]),
                None => Vec::new(),
            }
        };
        self.dispatch(mutated);
        Ok(())
    }

    /// Resolve the container for `node`: the nearest ancestor marked as a
    /// container, falling back to the document root.
    ///
    /// This is the tracker's default container-resolution rule. It never fails
    /// on its own; only custom resolvers can decline to produce a container.
    pub fn container_of(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.read();
        let mut current = inner.nodes.get(&node).and_then(Node::parent);
        while let Some(id) = current {
            let n = inner.nodes.get(&id)?;
            if n.is_container() {
                return Some(id);
            }
            current = n.parent();
        }
        Some(inner.root)
    }

    /// Concatenated character data of `node`'s subtree, in tree order.
    ///
    /// Markers contribute nothing.
    pub fn text_content(&self, node: NodeId) -> String {
        fn collect(inner: &DocumentInner, node: NodeId, out: &mut String) {
            if let Some(n) = inner.nodes.get(&node) {
                if let Some(text) = n.text_value() {
                    out.push_str(text);
                }
                for child in n.children() {
                    collect(inner, *child, out);
                }
            }
        }
        let inner = self.inner.read();
        let mut out = String::new();
        collect(&inner, node, &mut out);
        out
    }

    /// Install a mutation observer watching `target`'s subtree.
    pub fn observe<F>(&self, target: NodeId, callback: F) -> ObserverId
    where
        F: FnMut() + Send + 'static,
    {
        let id = ObserverId::new();
        self.inner.write().observers.push(Observer {
            id,
            target,
            active: Arc::new(AtomicBool::new(true)),
            callback: Arc::new(Mutex::new(Box::new(callback))),
        });
        trace!(observer = id.0, target = target.raw(), "observer installed");
        id
    }

    /// Disconnect an observer. Effective immediately, including from within
    /// the observer's own callback.
    pub fn disconnect(&self, id: ObserverId) {
        let mut inner = self.inner.write();
        if let Some(obs) = inner.observers.iter().find(|obs| obs.id == id) {
            obs.active.store(false, Ordering::SeqCst);
        }
        inner.observers.retain(|obs| obs.id != id);
    }

    /// Number of installed observers.
    pub fn observer_count(&self) -> usize {
        self.inner.read().observers.len()
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Run collected observer callbacks with no lock held. Observers
    /// disconnected by an earlier callback in the same batch are skipped, and
    /// a callback that is already running is not re-entered: a mutation made
    /// inside a callback under its own target skips that callback, which will
    /// re-inspect the document before returning anyway.
    fn dispatch(&self, observers: Vec<(Arc<AtomicBool>, Arc<Mutex<ObserverCallback>>)>) {
        for (active, callback) in observers {
            if active.load(Ordering::SeqCst) {
                if let Some(mut callback) = callback.try_lock() {
                    (*callback)();
                }
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Document")
            .field("root", &inner.root)
            .field("node_count", &inner.nodes.len())
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn new_document_has_connected_root() {
        let doc = Document::new();
        assert!(doc.is_connected(doc.root()));
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn created_nodes_start_detached() {
        let doc = Document::new();
        let div = doc.create_element("div");
        assert!(!doc.is_connected(div));
        assert!(doc.parent(div).is_none());
    }

    #[test]
    fn append_connects_subtrees() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("hello");

        doc.append_child(div, text).unwrap();
        assert!(!doc.is_connected(text));

        doc.append_child(doc.root(), div).unwrap();
        assert!(doc.is_connected(div));
        assert!(doc.is_connected(text));
        assert_eq!(doc.parent(text), Some(div));
    }

    #[test]
    fn insert_before_places_node_at_reference() {
        let doc = Document::new();
        let a = doc.create_text("a");
        let c = doc.create_text("c");
        doc.append_child(doc.root(), a).unwrap();
        doc.append_child(doc.root(), c).unwrap();

        let b = doc.create_text("b");
        doc.insert_before(b, c).unwrap();

        assert_eq!(doc.children(doc.root()), vec![a, b, c]);
        assert_eq!(doc.text_content(doc.root()), "abc");
    }

    #[test]
    fn insert_before_detached_reference_fails() {
        let doc = Document::new();
        let detached = doc.create_marker();
        let node = doc.create_text("x");
        assert!(matches!(
            doc.insert_before(node, detached),
            Err(Error::NoParent(_))
        ));
    }

    #[test]
    fn detach_is_idempotent() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();

        doc.detach(div).unwrap();
        assert!(!doc.is_connected(div));

        // Second detach is a no-op.
        doc.detach(div).unwrap();
    }

    #[test]
    fn appending_moves_an_attached_node() {
        let doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let text = doc.create_text("x");
        doc.append_child(doc.root(), first).unwrap();
        doc.append_child(doc.root(), second).unwrap();
        doc.append_child(first, text).unwrap();

        doc.append_child(second, text).unwrap();
        assert_eq!(doc.parent(text), Some(second));
        assert!(doc.children(first).is_empty());
    }

    #[test]
    fn insert_before_itself_is_a_no_op() {
        let doc = Document::new();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        doc.append_child(doc.root(), a).unwrap();
        doc.append_child(doc.root(), b).unwrap();

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        doc.observe(doc.root(), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        doc.insert_before(a, a).unwrap();
        assert_eq!(doc.children(doc.root()), vec![a, b]);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inserting_a_node_into_its_own_subtree_is_rejected() {
        let doc = Document::new();
        let parent = doc.create_element("div");
        let child = doc.create_element("div");
        doc.append_child(doc.root(), parent).unwrap();
        doc.append_child(parent, child).unwrap();

        assert!(matches!(
            doc.append_child(child, parent),
            Err(Error::Cycle(_))
        ));
        assert!(matches!(
            doc.append_child(parent, parent),
            Err(Error::Cycle(_))
        ));
        assert!(matches!(
            doc.insert_before(parent, child),
            Err(Error::Cycle(_))
        ));

        // The tree is untouched and containment walks still terminate.
        assert!(doc.is_connected(parent));
        assert_eq!(doc.parent(child), Some(parent));
        assert_eq!(doc.children(parent), vec![child]);
    }

    #[test]
    fn observer_may_mutate_under_its_own_target() {
        let doc = Document::new();
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        let doc_clone = doc.clone();

        // The callback appends a node under its own target on first fire.
        // The mutation it makes must not be re-delivered to it mid-run.
        doc.observe(doc.root(), move || {
            if fired_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                let extra = doc_clone.create_text("extra");
                doc_clone.append_child(doc_clone.root(), extra).unwrap();
            }
        });

        let first = doc.create_text("first");
        doc.append_child(doc.root(), first).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(doc.text_content(doc.root()), "firstextra");

        // Later mutations deliver normally again.
        let second = doc.create_text("second");
        doc.append_child(doc.root(), second).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn contains_includes_self_and_descendants() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("x");
        doc.append_child(div, text).unwrap();

        assert!(doc.contains(div, div));
        assert!(doc.contains(div, text));
        assert!(!doc.contains(text, div));
    }

    #[test]
    fn container_of_finds_nearest_marked_ancestor() {
        let doc = Document::new();
        let outer = doc.create_element("section");
        let inner = doc.create_element("div");
        let leaf = doc.create_marker();
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(inner, leaf).unwrap();

        // No container marked: falls back to the root.
        assert_eq!(doc.container_of(leaf), Some(doc.root()));

        doc.set_container(outer, true).unwrap();
        assert_eq!(doc.container_of(leaf), Some(outer));
    }

    #[test]
    fn observers_fire_on_child_list_mutations_in_subtree() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        doc.observe(div, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let text = doc.create_text("x");
        doc.append_child(div, text).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        doc.detach(text).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        // Mutation outside the observed subtree does not fire.
        let sibling = doc.create_element("div");
        doc.append_child(doc.root(), sibling).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_text_does_not_fire_observers() {
        let doc = Document::new();
        let text = doc.create_text("a");
        doc.append_child(doc.root(), text).unwrap();

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        doc.observe(doc.root(), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        doc.set_text(text, "b").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(doc.text_content(doc.root()), "b");
    }

    #[test]
    fn disconnected_observer_stops_firing() {
        let doc = Document::new();
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        let id = doc.observe(doc.root(), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let a = doc.create_text("a");
        doc.append_child(doc.root(), a).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        doc.disconnect(id);
        let b = doc.create_text("b");
        doc.append_child(doc.root(), b).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(doc.observer_count(), 0);
    }

    #[test]
    fn observer_may_disconnect_itself() {
        let doc = Document::new();
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        let doc_clone = doc.clone();

        // The callback disconnects its own observer on first fire.
        let id_cell: Arc<Mutex<Option<ObserverId>>> = Arc::new(Mutex::new(None));
        let id_cell_clone = id_cell.clone();
        let id = doc.observe(doc.root(), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell_clone.lock() {
                doc_clone.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        let a = doc.create_text("a");
        doc.append_child(doc.root(), a).unwrap();
        let b = doc.create_text("b");
        doc.append_child(doc.root(), b).unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn text_content_skips_markers() {
        let doc = Document::new();
        let before = doc.create_text("before[");
        let marker = doc.create_marker();
        let after = doc.create_text("]after");
        doc.append_child(doc.root(), before).unwrap();
        doc.append_child(doc.root(), marker).unwrap();
        doc.append_child(doc.root(), after).unwrap();

        assert_eq!(doc.text_content(doc.root()), "before[]after");
    }
}
