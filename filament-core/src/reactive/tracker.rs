//! Attach/Detach Tracker
//!
//! Given a node, the tracker reports once whether the node ever became
//! attached to the live tree, and if it did, notifies exactly once when it
//! later detaches.
//!
//! # How It Works
//!
//! 1. Tracking schedules a single check on the frame queue. The check is
//!    deliberately deferred, never immediate, so the caller can finish
//!    inserting the node into the tree first.
//!
//! 2. At check time, a connected node fires `on_add`, resolves its container
//!    (nearest marked ancestor by default, falling back to the root) and
//!    installs a mutation observer on that container. On the first mutation
//!    after which the node is no longer contained, the observer disconnects
//!    and `on_remove` fires.
//!
//! 3. A node that is not connected at check time, or whose custom resolver
//!    declines to produce a container, fires `on_remove` synchronously within
//!    the check, skipping `on_add`.
//!
//! `on_remove` fires at most once per tracked node; `on_add` fires at most
//! once and always before `on_remove` if it fires at all.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::frame::FrameQueue;
use crate::tree::{Document, NodeId, ObserverId};
use super::invalidation::{Invalidation, InvalidationTable};

/// One-shot callback receiving the tracked node.
pub type NodeCallback = Box<dyn FnOnce(NodeId) + Send>;

/// Custom container-resolution rule. Returning `None` declines to produce a
/// container, which counts as immediate removal.
pub type ContainerResolver = Box<dyn Fn(&Document, NodeId) -> Option<NodeId> + Send>;

/// Configuration record for one tracking request, with documented defaults:
/// no-op callbacks and the document's own container-resolution rule.
#[derive(Default)]
pub struct TrackOptions {
    /// Fired once if the node is connected at check time.
    pub on_add: Option<NodeCallback>,
    /// Fired exactly once when the node detaches (or never attached).
    pub on_remove: Option<NodeCallback>,
    /// Overrides [`Document::container_of`].
    pub resolve_container: Option<ContainerResolver>,
}

impl TrackOptions {
    /// Empty options: track with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the added callback.
    pub fn on_add<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(NodeId) + Send + 'static,
    {
        self.on_add = Some(Box::new(callback));
        self
    }

    /// Set the removed callback.
    pub fn on_remove<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(NodeId) + Send + 'static,
    {
        self.on_remove = Some(Box::new(callback));
        self
    }

    /// Set a custom container resolver.
    pub fn resolve_container<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Document, NodeId) -> Option<NodeId> + Send + 'static,
    {
        self.resolve_container = Some(Box::new(resolver));
        self
    }
}

/// Cloneable handle bundling the document, the frame queue and the
/// invalidation side table.
#[derive(Clone)]
pub struct Tracker {
    doc: Document,
    frames: FrameQueue,
    invalidations: Arc<InvalidationTable>,
}

impl Tracker {
    /// Create a tracker over a document and frame queue.
    pub fn new(doc: Document, frames: FrameQueue) -> Self {
        Self {
            doc,
            frames,
            invalidations: Arc::new(InvalidationTable::new()),
        }
    }

    /// The tracked document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The frame queue deferred checks are scheduled on.
    pub fn frames(&self) -> &FrameQueue {
        &self.frames
    }

    /// The invalidation side table.
    pub fn invalidations(&self) -> &InvalidationTable {
        &self.invalidations
    }

    /// Track attach/detach of `node`. The check runs on the next frame.
    pub fn track(&self, node: NodeId, options: TrackOptions) {
        let doc = self.doc.clone();
        self.frames.schedule(move || {
            let TrackOptions {
                on_add,
                on_remove,
                resolve_container,
            } = options;

            if !doc.is_connected(node) {
                debug!(node = node.raw(), "tracked node never attached");
                if let Some(removed) = on_remove {
                    removed(node);
                }
                return;
            }

            if let Some(added) = on_add {
                added(node);
            }

            let container = match &resolve_container {
                Some(resolver) => resolver(&doc, node),
                None => doc.container_of(node),
            };
            let Some(container) = container else {
                debug!(node = node.raw(), "no container resolved");
                if let Some(removed) = on_remove {
                    removed(node);
                }
                return;
            };

            // Watch the container for child-list mutations and fire the
            // removed callback on the first one that leaves `node` outside it.
            let observer_doc = doc.clone();
            let removed = Arc::new(Mutex::new(on_remove));
            let id_cell: Arc<Mutex<Option<ObserverId>>> = Arc::new(Mutex::new(None));
            let id_cell_inner = Arc::clone(&id_cell);
            let id = doc.observe(container, move || {
                if observer_doc.contains(container, node) {
                    return;
                }
                if let Some(id) = id_cell_inner.lock().take() {
                    observer_doc.disconnect(id);
                }
                debug!(node = node.raw(), "tracked node detached");
                if let Some(removed) = removed.lock().take() {
                    removed(node);
                }
            });
            *id_cell.lock() = Some(id);
        });
    }

    /// Memoized invalidation entry point: the returned future resolves when
    /// `node` detaches or is confirmed never-attached. Repeated calls for the
    /// same node observe the same pending/resolved outcome.
    pub fn invalidation(&self, node: NodeId) -> Invalidation {
        let (invalidation, created) = self.invalidations.acquire(node);
        if created {
            let table = Arc::clone(&self.invalidations);
            self.track(
                node,
                TrackOptions::new().on_remove(move |n| table.resolve(n)),
            );
        }
        invalidation
    }

    /// Defined teardown for a node the caller knows is garbage-eligible.
    pub fn release(&self, node: NodeId) {
        self.invalidations.release(node);
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("invalidations", &self.invalidations.len())
            .finish()
    }
}
