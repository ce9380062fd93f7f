//! Invalidation Table
//!
//! Each tracked node gets a single deferred completion, its invalidation,
//! resolving at most once, when the node is confirmed never-attached or later
//! detached. The completion is memoized per node: repeated requests observe
//! the same pending/resolved outcome.
//!
//! The memoization lives in an explicit side table keyed by node identity and
//! owned by the tracker subsystem, never on the node itself. The association
//! is weak: the table holds no node data, and [`InvalidationTable::release`]
//! is the defined teardown once a node is garbage-eligible. Releasing an
//! unresolved entry completes outstanding waiters so nothing hangs on a node
//! that no longer exists.

use std::pin::Pin;
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::tree::NodeId;

/// A cloneable future completing when the associated node leaves the live
/// tree (or is confirmed never to have joined it).
#[derive(Clone)]
pub struct Invalidation {
    inner: Shared<BoxFuture<'static, ()>>,
}

impl std::future::Future for Invalidation {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl std::fmt::Debug for Invalidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invalidation")
            .field("resolved", &self.inner.peek().is_some())
            .finish()
    }
}

struct Entry {
    future: Invalidation,
    resolver: Mutex<Option<oneshot::Sender<()>>>,
}

impl Entry {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel::<()>();
        let future = Invalidation {
            // A dropped sender also completes the future: released entries
            // must never leave waiters pending.
            inner: async move {
                let _ = rx.await;
            }
            .boxed()
            .shared(),
        };
        Self {
            future,
            resolver: Mutex::new(Some(tx)),
        }
    }
}

/// Side table mapping node identity to its memoized invalidation.
#[derive(Default)]
pub struct InvalidationTable {
    entries: DashMap<NodeId, Entry>,
}

impl InvalidationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the invalidation for `node`, creating it on first request.
    ///
    /// Returns the shared future plus whether this call created the entry
    /// (the caller installs detachment tracking only on creation).
    pub fn acquire(&self, node: NodeId) -> (Invalidation, bool) {
        let mut created = false;
        let entry = self.entries.entry(node).or_insert_with(|| {
            created = true;
            Entry::new()
        });
        (entry.future.clone(), created)
    }

    /// Resolve the invalidation for `node`. A second resolution, or resolving
    /// an unknown node, is a no-op.
    pub fn resolve(&self, node: NodeId) {
        if let Some(entry) = self.entries.get(&node) {
            if let Some(tx) = entry.resolver.lock().take() {
                let _ = tx.send(());
            }
        }
    }

    /// Drop the entry for `node`. Outstanding clones of its invalidation
    /// complete immediately.
    pub fn release(&self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for InvalidationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationTable")
            .field("len", &self.len())
            .finish()
    }
}
